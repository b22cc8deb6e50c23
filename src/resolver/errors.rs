use crate::onchain::SourceError;
use alloy_primitives::{Address, U256};
use std::fmt;
use thiserror::Error;

/// Which token mapping a search was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Balance,
    Allowance,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Balance => write!(f, "balance"),
            Self::Allowance => write!(f, "allowance"),
        }
    }
}

/// Errors that can occur while resolving or mocking a storage slot.
#[derive(Debug, Error)]
pub enum SlotError {
    /// The holder's balance is zero, so there is nothing to match storage against.
    #[error("{holder} has no balance of {token}; cannot search without a nonzero oracle value")]
    NoBalance {
        /// Token contract
        token: Address,
        /// Holder whose balance was read
        holder: Address,
    },

    /// No candidate slot matched under either layout convention.
    #[error("no {mapping} slot of {token} matched within {max_slots} slots")]
    SlotNotFound {
        /// Token contract
        token: Address,
        /// Mapping that was searched for
        mapping: MappingKind,
        /// Search ceiling that was exhausted
        max_slots: u64,
    },

    /// The allowance is zero and the fixed-slot fallback was not requested.
    #[error("{spender} has no allowance from {owner} on {token}; enable the fallback slot")]
    AllowanceNotFound {
        /// Token contract
        token: Address,
        /// Allowance owner
        owner: Address,
        /// Allowance spender
        spender: Address,
    },

    /// A value does not fit the packed field it is written into.
    #[error("{field} value {value} exceeds {bits} bits")]
    AmountOverflow {
        /// Field being packed
        field: &'static str,
        /// Offending value
        value: U256,
        /// Width of the field
        bits: u32,
    },

    /// The chain data source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl SlotError {
    /// Whether searching more slots could succeed where this search failed.
    pub fn is_retryable_with_larger_search(&self) -> bool {
        matches!(self, Self::SlotNotFound { .. })
    }

    /// Whether enabling the fixed-slot fallback could succeed where this search failed.
    /// Only allowance searches have a fallback.
    pub fn suggests_fallback(&self) -> bool {
        matches!(
            self,
            Self::AllowanceNotFound { .. }
                | Self::SlotNotFound { mapping: MappingKind::Allowance, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_allowance_searches_suggest_fallback() {
        let token = Address::repeat_byte(0x11);
        let balance =
            SlotError::SlotNotFound { token, mapping: MappingKind::Balance, max_slots: 30 };
        assert!(balance.is_retryable_with_larger_search());
        assert!(!balance.suggests_fallback());

        let allowance =
            SlotError::SlotNotFound { token, mapping: MappingKind::Allowance, max_slots: 30 };
        assert!(allowance.suggests_fallback());
        assert!(allowance.to_string().starts_with("no allowance slot of"));
    }
}
