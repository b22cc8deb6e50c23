//! Storage key formulas for token mappings.
//!
//! A mapping declared at slot `N` stores `m[key]` at a keccak256 of the padded key and the
//! padded slot. Solidity hashes `(key, N)`; Vyper hashes `(N, key)`. Nested mappings chain the
//! same rule, with the outer hash taking the place of `N`:
//!
//! ```text
//!   Standard  balances[holder]          = keccak256(holder ++ N)
//!   Reversed  balances[holder]          = keccak256(N ++ holder)
//!   Standard  allowance[owner][spender] = keccak256(spender ++ keccak256(owner ++ N))
//!   Reversed  allowance[owner][spender] = keccak256(keccak256(N ++ owner) ++ spender)
//! ```
//!
//! All words are left-padded to 32 bytes, matching `abi.encode`.

pub mod helpers;

pub use helpers::{decode_u256, encode_address, encode_index, encode_u256, hash_pair};

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Argument order used when hashing a mapping key together with its base slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutConvention {
    /// `keccak256(key ++ slot)`, the Solidity rule.
    Standard,
    /// `keccak256(slot ++ key)`, the Vyper rule.
    Reversed,
}

impl LayoutConvention {
    /// Probe order used by the resolvers at each candidate index.
    pub const PROBE_ORDER: [Self; 2] = [Self::Standard, Self::Reversed];

    /// Whether this is the Vyper hashing order.
    pub fn is_vyper(self) -> bool {
        matches!(self, Self::Reversed)
    }

    /// Map an `is_vyper` flag back to a convention.
    pub fn from_is_vyper(is_vyper: bool) -> Self {
        if is_vyper {
            Self::Reversed
        } else {
            Self::Standard
        }
    }

    /// Hash a mapping key against a prior slot word in this convention's order.
    fn hash_key(self, key: B256, prior: B256) -> B256 {
        match self {
            Self::Standard => hash_pair(key, prior),
            Self::Reversed => hash_pair(prior, key),
        }
    }

    /// Storage key of `mapping(address => _)[key]` declared at `base`.
    pub fn mapping_slot(self, key: Address, base: u64) -> B256 {
        self.hash_key(encode_address(key), encode_index(base))
    }

    /// Storage keys of `mapping(address => mapping(address => _))[outer][inner]` declared at
    /// `base`.
    pub fn nested_mapping_slot(self, outer: Address, inner: Address, base: u64) -> NestedSlot {
        let outer_hash = self.mapping_slot(outer, base);
        let storage_key = self.hash_key(encode_address(inner), outer_hash);
        NestedSlot { outer_hash, storage_key }
    }
}

impl fmt::Display for LayoutConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "solidity"),
            Self::Reversed => write!(f, "vyper"),
        }
    }
}

/// Both hashes of a two-level mapping lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedSlot {
    /// `keccak256` of the outer key and the base slot; the inner mapping's own slot.
    pub outer_hash: B256,
    /// Final storage key holding the value.
    pub storage_key: B256,
}

/// Storage key of a Solidity mapping nested once per key in `keys`, declared at `base`.
///
/// `keys[0]` is the outermost key. Used for fixed layouts such as Permit2's
/// `allowance[owner][token][spender]`.
pub fn chained_mapping_slot(keys: &[Address], base: u64) -> B256 {
    keys.iter().fold(encode_index(base), |prior, key| {
        LayoutConvention::Standard.hash_key(encode_address(*key), prior)
    })
}
