use super::abi::{IAllowanceTransfer, IERC20};
use super::{ContractCaller, SourceError, StorageReader};
use crate::layout::{decode_u256, encode_u256, LayoutConvention};
use crate::permit2;
use crate::statediff::StateOverrides;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolInterface, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Where an in-memory token keeps its two mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLayout {
    /// Hashing order of the token's mappings.
    pub convention: LayoutConvention,
    /// Declaration slot of `balances`.
    pub balance_slot: u64,
    /// Declaration slot of `allowances`.
    pub allowance_slot: u64,
}

impl TokenLayout {
    pub fn new(convention: LayoutConvention, balance_slot: u64, allowance_slot: u64) -> Self {
        Self { convention, balance_slot, allowance_slot }
    }

    fn balance_key(&self, account: Address) -> B256 {
        self.convention.mapping_slot(account, self.balance_slot)
    }

    fn allowance_key(&self, owner: Address, spender: Address) -> B256 {
        self.convention.nested_mapping_slot(owner, spender, self.allowance_slot).storage_key
    }
}

#[derive(Debug, Clone, Copy)]
enum Contract {
    Token(TokenLayout),
    Permit2,
}

/// A deterministic chain held in memory.
///
/// Tokens answer `balanceOf`/`allowance` from their own storage using the layout they were
/// deployed with, so overrides built by the mock generators are observed exactly as a node
/// would observe them. Counts storage reads and calls for cache assertions.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    storage: Mutex<HashMap<(Address, B256), B256>>,
    contracts: Mutex<HashMap<Address, Contract>>,
    storage_reads: AtomicU64,
    calls: AtomicU64,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy an ERC20 token at `address` with the given storage layout.
    pub fn deploy_token(&self, address: Address, layout: TokenLayout) {
        self.contracts
            .lock()
            .expect("contracts lock poisoned")
            .insert(address, Contract::Token(layout));
    }

    /// Deploy a Permit2 registry at `address`.
    pub fn deploy_permit2(&self, address: Address) {
        self.contracts
            .lock()
            .expect("contracts lock poisoned")
            .insert(address, Contract::Permit2);
    }

    /// Write a raw storage word.
    pub fn set_storage(&self, address: Address, slot: B256, value: B256) {
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .insert((address, slot), value);
    }

    /// Set `balanceOf(account)` on a deployed token.
    pub fn set_balance(&self, token: Address, account: Address, amount: U256) {
        if let Some(layout) = self.token_layout(token) {
            self.set_storage(token, layout.balance_key(account), encode_u256(amount));
        }
    }

    /// Set `allowance(owner, spender)` on a deployed token.
    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        if let Some(layout) = self.token_layout(token) {
            self.set_storage(token, layout.allowance_key(owner, spender), encode_u256(amount));
        }
    }

    /// Write a packed Permit2 allowance word into the registry at `registry`.
    pub fn set_permit2_word(
        &self,
        registry: Address,
        owner: Address,
        token: Address,
        spender: Address,
        word: B256,
    ) {
        self.set_storage(registry, permit2::compute_allowance_key(owner, token, spender), word);
    }

    /// Number of `read_storage` calls served so far.
    pub fn storage_reads(&self) -> u64 {
        self.storage_reads.load(Ordering::Relaxed)
    }

    /// Number of contract calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Reset the read and call counters.
    pub fn reset_counters(&self) {
        self.storage_reads.store(0, Ordering::Relaxed);
        self.calls.store(0, Ordering::Relaxed);
    }

    fn token_layout(&self, address: Address) -> Option<TokenLayout> {
        match self.contracts.lock().expect("contracts lock poisoned").get(&address) {
            Some(Contract::Token(layout)) => Some(*layout),
            _ => None,
        }
    }

    fn stored(&self, address: Address, slot: B256) -> B256 {
        self.storage
            .lock()
            .expect("storage lock poisoned")
            .get(&(address, slot))
            .copied()
            .unwrap_or(B256::ZERO)
    }

    /// Storage as seen by a call: overridden slots first, then committed state.
    fn sload(&self, address: Address, slot: B256, overrides: Option<&StateOverrides>) -> B256 {
        overrides
            .and_then(|o| o.storage_override(address, slot))
            .unwrap_or_else(|| self.stored(address, slot))
    }

    fn execute_token(
        &self,
        to: Address,
        layout: TokenLayout,
        input: &[u8],
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError> {
        let call = IERC20::IERC20Calls::abi_decode(input).map_err(|e| SourceError::Reverted {
            contract: to,
            reason: e.to_string(),
        })?;
        let key = match call {
            IERC20::IERC20Calls::balanceOf(c) => layout.balance_key(c.account),
            IERC20::IERC20Calls::allowance(c) => layout.allowance_key(c.owner, c.spender),
        };
        let value = decode_u256(self.sload(to, key, overrides));
        Ok(Bytes::from(value.abi_encode()))
    }

    fn execute_permit2(
        &self,
        to: Address,
        input: &[u8],
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError> {
        let call = IAllowanceTransfer::allowanceCall::abi_decode(input).map_err(|e| {
            SourceError::Reverted { contract: to, reason: e.to_string() }
        })?;
        let key = permit2::compute_allowance_key(call.owner, call.token, call.spender);
        let record = permit2::unpack_allowance(self.sload(to, key, overrides));
        let output = (record.amount, U256::from(record.expiration), U256::from(record.nonce));
        Ok(Bytes::from(output.abi_encode()))
    }
}

#[async_trait]
impl StorageReader for InMemoryChain {
    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, SourceError> {
        self.storage_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.stored(address, slot))
    }
}

#[async_trait]
impl ContractCaller for InMemoryChain {
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let contract =
            self.contracts.lock().expect("contracts lock poisoned").get(&to).copied();
        match contract {
            Some(Contract::Token(layout)) => self.execute_token(to, layout, &input, overrides),
            Some(Contract::Permit2) => self.execute_permit2(to, &input, overrides),
            None => {
                Err(SourceError::Reverted { contract: to, reason: "no code at address".into() })
            }
        }
    }
}
