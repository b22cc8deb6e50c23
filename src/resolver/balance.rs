use super::scan::scan;
use super::{MappingKind, SlotError, SlotResolver};
use crate::cache::SlotRecord;
use crate::layout::{decode_u256, LayoutConvention};
use crate::onchain::{self, ChainReader, StorageReader};
use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use tracing::{debug, info};

/// Where a token stores balances, plus the balance that proved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSlot {
    /// Declaration slot of the `balances` mapping.
    pub slot_index: u64,
    /// Hashing order of the mapping.
    pub layout: LayoutConvention,
    /// Holder balance read at the discovered key.
    pub balance: U256,
}

impl BalanceSlot {
    pub fn is_vyper(&self) -> bool {
        self.layout.is_vyper()
    }

    /// Storage key of `balances[account]` under this location.
    pub fn storage_key(&self, account: Address) -> B256 {
        self.layout.mapping_slot(account, self.slot_index)
    }
}

impl<C: ChainReader> SlotResolver<C> {
    /// Find the slot index and layout of `token`'s balance mapping using `holder`'s balance.
    ///
    /// On a cache hit the recorded location is reused and only the holder's balance word is
    /// read. Otherwise `holder` must have a nonzero balance, and indices `0..max_slots` are
    /// searched. A failed search leaves the cache untouched.
    pub async fn resolve_balance_slot(
        &self,
        token: Address,
        holder: Address,
        max_slots: u64,
    ) -> Result<BalanceSlot, SlotError> {
        if let Some(record) = self.balances.get(token) {
            return self.balance_from_record(record, holder).await;
        }

        let _search = self.balances.lock_token(token).await;
        if let Some(record) = self.balances.peek(token) {
            debug!(%token, "balance slot found by concurrent search");
            return self.balance_from_record(record, holder).await;
        }

        let balance = onchain::read_balance(&self.chain, token, holder, None).await?;
        if balance.is_zero() {
            return Err(SlotError::NoBalance { token, holder });
        }
        debug!(%token, %holder, %balance, max_slots, "searching balance slot");

        let found = scan(
            &self.chain,
            token,
            0..max_slots,
            self.config.probe_concurrency,
            balance,
            |index, layout| layout.mapping_slot(holder, index),
        )
        .await?;

        let Some(found) = found else {
            let mapping = MappingKind::Balance;
            return Err(SlotError::SlotNotFound { token, mapping, max_slots });
        };
        self.balances.insert(SlotRecord::new(token, found.index, found.layout));
        info!(%token, slot = found.index, layout = %found.layout, "resolved balance slot");
        Ok(BalanceSlot { slot_index: found.index, layout: found.layout, balance: found.value })
    }

    async fn balance_from_record(
        &self,
        record: SlotRecord,
        holder: Address,
    ) -> Result<BalanceSlot, SlotError> {
        let key = record.layout.mapping_slot(holder, record.slot_index);
        let word = self.chain.read_storage(record.token, key).await?;
        Ok(BalanceSlot {
            slot_index: record.slot_index,
            layout: record.layout,
            balance: decode_u256(word),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::onchain::SourceError;
    use crate::resolver::fixtures::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_standard_token_resolves_slot_9() {
        let resolver = resolver();
        let found = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(found.slot_index, 9);
        assert!(!found.is_vyper());
        assert_eq!(found.balance, U256::from(HOLDER_BALANCE));
    }

    #[tokio::test]
    async fn test_reversed_token_resolves_slot_3() {
        let resolver = resolver();
        let found = resolver.resolve_balance_slot(REVERSED_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(found.slot_index, 3);
        assert!(found.is_vyper());
        assert_eq!(found.storage_key(HOLDER), LayoutConvention::Reversed.mapping_slot(HOLDER, 3));
    }

    #[tokio::test]
    async fn test_zero_balance_is_no_balance() {
        let resolver = resolver();
        let err = resolver.resolve_balance_slot(STANDARD_TOKEN, OTHER, 30).await.unwrap_err();
        assert!(matches!(err, SlotError::NoBalance { .. }));
        assert!(resolver.balance_cache().is_empty());
    }

    #[tokio::test]
    async fn test_search_ceiling_below_slot_is_not_found() {
        let resolver = resolver();
        let err = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 9).await.unwrap_err();
        assert!(matches!(
            err,
            SlotError::SlotNotFound { mapping: MappingKind::Balance, max_slots: 9, .. }
        ));
        assert!(err.is_retryable_with_larger_search());
        assert!(!err.suggests_fallback());
        assert!(resolver.balance_cache().peek(STANDARD_TOKEN).is_none());

        let found = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 10).await.unwrap();
        assert_eq!(found.slot_index, 9);
    }

    #[tokio::test]
    async fn test_cache_hit_reads_one_word() {
        let resolver = resolver();
        let first = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();

        resolver.chain().reset_counters();
        let second = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.chain().calls(), 0);
        assert_eq!(resolver.chain().storage_reads(), 1);
        assert_eq!(resolver.balance_cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_serves_other_holders() {
        let resolver = resolver();
        resolver.resolve_balance_slot(REVERSED_TOKEN, HOLDER, 30).await.unwrap();

        // A zero-balance holder still resolves once the token's layout is known.
        let found = resolver.resolve_balance_slot(REVERSED_TOKEN, OTHER, 30).await.unwrap();
        assert_eq!(found.slot_index, 3);
        assert_eq!(found.layout, LayoutConvention::Reversed);
        assert_eq!(found.balance, U256::ZERO);
    }

    #[tokio::test]
    async fn test_expired_record_searches_again() {
        let config = ResolverConfig { record_ttl_secs: Some(0), ..Default::default() };
        let resolver = SlotResolver::new(chain(), config);
        resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();

        resolver.chain().reset_counters();
        resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(resolver.chain().calls(), 1);
        assert_eq!(resolver.balance_cache().stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_share_one_search() {
        let resolver = Arc::new(resolver());
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move {
                    resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().slot_index, 9);
        }
        assert_eq!(resolver.chain().calls(), 1);
        assert_eq!(resolver.balance_cache().stats().insertions, 1);
    }

    #[tokio::test]
    async fn test_source_failure_leaves_cache_empty() {
        let resolver = SlotResolver::new(FailingChain::new(6), ResolverConfig::default());
        let err = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap_err();
        assert!(matches!(err, SlotError::Source(SourceError::Reverted { .. })));
        assert!(resolver.balance_cache().is_empty());

        let found = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(found.slot_index, 9);
        assert_eq!(resolver.balance_cache().peek(STANDARD_TOKEN).unwrap().slot_index, 9);
    }

    #[tokio::test]
    async fn test_tokens_cache_independently() {
        let resolver = resolver();
        resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();
        resolver.resolve_balance_slot(REVERSED_TOKEN, HOLDER, 30).await.unwrap();

        let cache = resolver.balance_cache();
        assert_eq!(cache.peek(STANDARD_TOKEN).unwrap().layout, LayoutConvention::Standard);
        assert_eq!(cache.peek(REVERSED_TOKEN).unwrap().layout, LayoutConvention::Reversed);
    }

    #[tokio::test]
    #[ignore = "requires ETH_RPC_URL"]
    async fn test_live_crv_balance_slot() {
        let resolver = live_resolver("ETH_RPC_URL");
        let found = resolver.resolve_balance_slot(REVERSED_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(found.slot_index, 3);
        assert!(found.is_vyper());
    }

    #[tokio::test]
    #[ignore = "requires BASE_RPC_URL"]
    async fn test_live_usdc_balance_slot() {
        let resolver = live_resolver("BASE_RPC_URL");
        let found = resolver.resolve_balance_slot(STANDARD_TOKEN, HOLDER, 30).await.unwrap();
        assert_eq!(found.slot_index, 9);
        assert!(!found.is_vyper());
    }
}
