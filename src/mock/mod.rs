//! Override data that makes a token report a chosen balance or allowance.
//!
//! Generators resolve the real mapping location from an account that actually holds a balance
//! (or approval), then recompute the storage key for an arbitrary mock address at that same
//! location. Writing the value at that key through an `eth_call` state override makes the token
//! return it for the mock address:
//!
//! ```text
//!   generate_mock_balance(token, holder, mock)
//!     → resolve_balance_slot(token, holder)        slot N, layout L
//!     → key = L.mapping_slot(mock, N)
//!
//!   generate_mock_approval(token, owner, spender, mock)
//!     → resolve_approval_slot(token, owner, spender) slot N, layout L
//!     → key = L.nested_mapping_slot(mock, spender, N)
//! ```

use crate::layout::{decode_u256, encode_u256, LayoutConvention};
use crate::onchain::ChainReader;
use crate::resolver::{SlotError, SlotResolver};
use crate::statediff::StateOverrides;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One storage override: write `override_value` at `override_key` of the target contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockData {
    pub override_key: B256,
    pub override_value: B256,
    pub layout: LayoutConvention,
}

impl MockData {
    pub fn is_vyper(&self) -> bool {
        self.layout.is_vyper()
    }

    /// The override value as an unsigned integer.
    pub fn value(&self) -> U256 {
        decode_u256(self.override_value)
    }

    /// A state override map holding only this entry, applied to `contract`.
    pub fn into_overrides(self, contract: Address) -> StateOverrides {
        StateOverrides::new().with_mock(contract, &self)
    }
}

impl<C: ChainReader> SlotResolver<C> {
    /// Override data giving `mock` a `token` balance.
    ///
    /// The location is discovered from `holder`, which must hold a nonzero balance unless the
    /// token's layout is already cached. `value` defaults to `holder`'s current balance.
    pub async fn generate_mock_balance(
        &self,
        token: Address,
        holder: Address,
        mock: Address,
        value: Option<U256>,
        max_slots: u64,
    ) -> Result<MockData, SlotError> {
        let resolved = self.resolve_balance_slot(token, holder, max_slots).await?;
        let value = value.unwrap_or(resolved.balance);
        debug!(%token, %mock, %value, slot = resolved.slot_index, "mock balance");
        Ok(MockData {
            override_key: resolved.storage_key(mock),
            override_value: encode_u256(value),
            layout: resolved.layout,
        })
    }

    /// Override data making `token` report `allowance(mock, spender) == value`.
    ///
    /// The location is discovered from `(owner, spender)`; see
    /// [`resolve_approval_slot`](Self::resolve_approval_slot) for the fallback rules.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_mock_approval(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        mock: Address,
        value: U256,
        max_slots: u64,
        use_fallback: bool,
    ) -> Result<MockData, SlotError> {
        let resolved =
            self.resolve_approval_slot(token, owner, spender, max_slots, use_fallback).await?;
        let nested = resolved.layout.nested_mapping_slot(mock, spender, resolved.slot_index);
        debug!(%token, %mock, %spender, %value, slot = resolved.slot_index, "mock approval");
        Ok(MockData {
            override_key: nested.storage_key,
            override_value: encode_u256(value),
            layout: resolved.layout,
        })
    }
}
