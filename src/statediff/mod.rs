//! State override maps for simulated calls.
//!
//! The mock generators produce `(storage key, value)` pairs; this module collects them per
//! contract into the shape `eth_call` accepts as its third parameter:
//!
//! ```text
//!   {
//!     "0x8335…2913": { "stateDiff": { "0x<key32>": "0x<value32>" } },
//!     "0x0000…8ba3": { "stateDiff": { … } }
//!   }
//! ```
//!
//! `stateDiff` replaces only the listed slots; every other slot keeps its on-chain value.
//!
//! # Usage
//! ```ignore
//! let mock = resolver.generate_mock_balance(token, holder, mock_addr, None, 30).await?;
//! let overrides = StateOverrides::new().with_mock(token, &mock);
//! println!("{}", serde_json::to_string_pretty(&overrides)?);
//! ```

use crate::mock::MockData;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage overrides for a single contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverride {
    /// Slots to replace, keyed by storage key.
    pub state_diff: BTreeMap<B256, B256>,
}

impl AccountOverride {
    /// Number of overridden slots.
    pub fn slot_count(&self) -> usize {
        self.state_diff.len()
    }

    /// Whether no slot is overridden.
    pub fn is_empty(&self) -> bool {
        self.state_diff.is_empty()
    }
}

/// Override map keyed by contract address.
///
/// Inserting the same `(contract, key)` twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateOverrides {
    accounts: BTreeMap<Address, AccountOverride>,
}

impl StateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override one storage slot of `contract`.
    pub fn insert(&mut self, contract: Address, key: B256, value: B256) {
        self.accounts.entry(contract).or_default().state_diff.insert(key, value);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_slot(mut self, contract: Address, key: B256, value: B256) -> Self {
        self.insert(contract, key, value);
        self
    }

    /// Add the override described by a generated [`MockData`].
    pub fn insert_mock(&mut self, contract: Address, mock: &MockData) {
        self.insert(contract, mock.override_key, mock.override_value);
    }

    /// Builder form of [`insert_mock`](Self::insert_mock).
    pub fn with_mock(mut self, contract: Address, mock: &MockData) -> Self {
        self.insert_mock(contract, mock);
        self
    }

    /// Merge another map into this one; entries from `other` win on conflict.
    pub fn merge(&mut self, other: StateOverrides) {
        for (contract, account) in other.accounts {
            let entry = self.accounts.entry(contract).or_default();
            entry.state_diff.extend(account.state_diff);
        }
    }

    /// The overriding value for `(contract, key)`, if any.
    pub fn storage_override(&self, contract: Address, key: B256) -> Option<B256> {
        self.accounts.get(&contract).and_then(|a| a.state_diff.get(&key)).copied()
    }

    /// Overrides for a single contract.
    pub fn account(&self, contract: &Address) -> Option<&AccountOverride> {
        self.accounts.get(contract)
    }

    /// Number of contracts with overrides.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Total number of overridden slots across all contracts.
    pub fn total_slot_count(&self) -> usize {
        self.accounts.values().map(|a| a.slot_count()).sum()
    }

    /// Whether the map overrides nothing.
    pub fn is_empty(&self) -> bool {
        self.accounts.values().all(|a| a.is_empty())
    }

    /// Return a one-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "contracts={} slots={}",
            self.account_count(),
            self.total_slot_count()
        )
    }
}
