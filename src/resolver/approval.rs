use super::scan::{scan, SlotMatch};
use super::{MappingKind, SlotError, SlotResolver};
use crate::cache::SlotRecord;
use crate::layout::LayoutConvention;
use crate::onchain::{self, ChainReader};
use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where a token stores `allowance[owner][spender]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSlot {
    /// Declaration slot of the allowance mapping.
    pub slot_index: u64,
    /// Hashing order of the mapping.
    pub layout: LayoutConvention,
    /// Outer hash of `owner` and the slot index.
    pub slot_hash: B256,
    /// Final storage key of the allowance word.
    pub storage_key: B256,
    /// False when the location is the assumed fallback slot with nothing on chain to confirm it.
    pub verified: bool,
}

impl ApprovalSlot {
    fn new(
        slot_index: u64,
        layout: LayoutConvention,
        owner: Address,
        spender: Address,
        verified: bool,
    ) -> Self {
        let nested = layout.nested_mapping_slot(owner, spender, slot_index);
        Self {
            slot_index,
            layout,
            slot_hash: nested.outer_hash,
            storage_key: nested.storage_key,
            verified,
        }
    }

    pub fn is_vyper(&self) -> bool {
        self.layout.is_vyper()
    }
}

impl<C: ChainReader> SlotResolver<C> {
    /// Find the slot index and layout of `token`'s allowance mapping using
    /// `allowance(owner, spender)`.
    ///
    /// A cache hit performs no chain access. Without `use_fallback`, a zero allowance fails with
    /// [`SlotError::AllowanceNotFound`] and a nonzero allowance with no match fails with
    /// [`SlotError::SlotNotFound`]. With `use_fallback`, the configured fallback slot is tried
    /// under both conventions; if the allowance is zero and neither matches, the fallback slot is
    /// returned unverified in the Standard layout. Unverified results are never cached.
    pub async fn resolve_approval_slot(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        max_slots: u64,
        use_fallback: bool,
    ) -> Result<ApprovalSlot, SlotError> {
        if let Some(record) = self.approvals.get(token) {
            return Ok(ApprovalSlot::new(record.slot_index, record.layout, owner, spender, true));
        }

        let _search = self.approvals.lock_token(token).await;
        if let Some(record) = self.approvals.peek(token) {
            debug!(%token, "approval slot found by concurrent search");
            return Ok(ApprovalSlot::new(record.slot_index, record.layout, owner, spender, true));
        }

        let allowance = onchain::read_allowance(&self.chain, token, owner, spender, None).await?;
        if allowance.is_zero() {
            if !use_fallback {
                return Err(SlotError::AllowanceNotFound { token, owner, spender });
            }
        } else {
            debug!(%token, %owner, %spender, %allowance, max_slots, "searching approval slot");
            let found = scan(
                &self.chain,
                token,
                0..max_slots,
                self.config.probe_concurrency,
                allowance,
                |index, layout| layout.nested_mapping_slot(owner, spender, index).storage_key,
            )
            .await?;
            if let Some(found) = found {
                return Ok(self.record_approval(token, owner, spender, found));
            }
            if !use_fallback || self.config.fallback_slot < max_slots {
                return Err(not_found(token, max_slots));
            }
        }

        self.resolve_fallback(token, owner, spender, allowance, max_slots).await
    }

    async fn resolve_fallback(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        allowance: U256,
        max_slots: u64,
    ) -> Result<ApprovalSlot, SlotError> {
        let index = self.config.fallback_slot;
        let found = scan(
            &self.chain,
            token,
            std::iter::once(index),
            1,
            allowance,
            |index, layout| layout.nested_mapping_slot(owner, spender, index).storage_key,
        )
        .await?;

        match found {
            Some(found) if !allowance.is_zero() => {
                Ok(self.record_approval(token, owner, spender, found))
            }
            Some(found) => {
                debug!(%token, slot = index, layout = %found.layout, "fallback slot reads zero");
                Ok(ApprovalSlot::new(index, found.layout, owner, spender, false))
            }
            None if allowance.is_zero() => {
                warn!(%token, slot = index, "assuming fallback approval slot without a match");
                Ok(ApprovalSlot::new(index, LayoutConvention::Standard, owner, spender, false))
            }
            None => Err(not_found(token, max_slots)),
        }
    }

    fn record_approval(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        found: SlotMatch,
    ) -> ApprovalSlot {
        self.approvals.insert(SlotRecord::new(token, found.index, found.layout));
        info!(%token, slot = found.index, layout = %found.layout, "resolved approval slot");
        ApprovalSlot::new(found.index, found.layout, owner, spender, true)
    }
}

fn not_found(token: Address, max_slots: u64) -> SlotError {
    SlotError::SlotNotFound { token, mapping: MappingKind::Allowance, max_slots }
}
