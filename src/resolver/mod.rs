//! Storage slot discovery for ERC20 balances and allowances.
//!
//! The declaration slot of a token's `balances`/`allowances` mapping is not exposed by the
//! token, so it is found by brute force: read the true value through the token's own getter
//! (the oracle), then probe candidate storage keys under both hashing orders until one holds
//! exactly that value.
//!
//! ```text
//!   resolve_balance_slot(token, holder)
//!     → cache hit?   read balances[holder] at the recorded slot, done
//!     → balanceOf(holder)                       (oracle, must be nonzero)
//!     → scan 0..max_slots × {Standard, Reversed}
//!     → cache (token → slot, layout)
//!
//!   resolve_approval_slot(token, owner, spender)
//!     → cache hit?   recompute keys from the recorded slot, done
//!     → allowance(owner, spender)               (oracle)
//!     → scan 0..max_slots × {Standard, Reversed}
//!     → fallback slot (optional)
//! ```
//!
//! Searches for the same token are serialized, so concurrent callers share one search.

mod approval;
mod balance;
pub mod errors;
#[cfg(test)]
pub(crate) mod fixtures;
mod scan;

pub use approval::ApprovalSlot;
pub use balance::BalanceSlot;
pub use errors::{MappingKind, SlotError};

use crate::cache::{SharedSlotCache, SlotCache};
use crate::config::ResolverConfig;
use crate::onchain::{self, ChainReader, Permit2Allowance};
use crate::statediff::StateOverrides;
use alloy_primitives::{Address, U256};

/// Discovers mapping slots on one chain and remembers them per token.
#[derive(Debug)]
pub struct SlotResolver<C> {
    chain: C,
    config: ResolverConfig,
    balances: SharedSlotCache,
    approvals: SharedSlotCache,
}

impl<C: ChainReader> SlotResolver<C> {
    /// Create a resolver with fresh caches.
    pub fn new(chain: C, config: ResolverConfig) -> Self {
        let ttl = config.record_ttl();
        Self::with_caches(chain, config, SlotCache::shared(ttl), SlotCache::shared(ttl))
    }

    /// Create a resolver that shares existing caches, e.g. with another resolver on the
    /// same chain.
    pub fn with_caches(
        chain: C,
        config: ResolverConfig,
        balances: SharedSlotCache,
        approvals: SharedSlotCache,
    ) -> Self {
        Self { chain, config, balances, approvals }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Cache of balance mapping locations.
    pub fn balance_cache(&self) -> &SharedSlotCache {
        &self.balances
    }

    /// Cache of allowance mapping locations.
    pub fn approval_cache(&self) -> &SharedSlotCache {
        &self.approvals
    }

    /// `balanceOf(account)` on `token`, optionally under `overrides`.
    pub async fn read_balance(
        &self,
        token: Address,
        account: Address,
        overrides: Option<&StateOverrides>,
    ) -> Result<U256, SlotError> {
        Ok(onchain::read_balance(&self.chain, token, account, overrides).await?)
    }

    /// `allowance(owner, spender)` on `token`, optionally under `overrides`.
    pub async fn read_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        overrides: Option<&StateOverrides>,
    ) -> Result<U256, SlotError> {
        Ok(onchain::read_allowance(&self.chain, token, owner, spender, overrides).await?)
    }

    /// Permit2 allowance on the configured registry, optionally under `overrides`.
    pub async fn read_permit2_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        overrides: Option<&StateOverrides>,
    ) -> Result<Permit2Allowance, SlotError> {
        let registry = self.config.permit2_address;
        Ok(onchain::read_permit2_allowance(&self.chain, registry, owner, token, spender, overrides)
            .await?)
    }
}
