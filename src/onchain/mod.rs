//! Chain data sources.
//!
//! The resolvers only need two capabilities from a chain: reading a raw storage word and
//! executing a read-only contract call (optionally under a state override). Both are traits so
//! that the search logic runs unchanged against a JSON-RPC node or an in-memory chain:
//!
//! ```text
//!   SlotResolver
//!     → StorageReader   (eth_getStorageAt)
//!     → ContractCaller  (eth_call [+ stateDiff overrides])
//!       → RpcChainReader (jsonrpsee http client) / InMemoryChain (tests, `test-utils`)
//! ```

pub mod abi;
pub mod errors;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod providers;
pub mod queries;

pub use errors::SourceError;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryChain, TokenLayout};
pub use providers::RpcChainReader;
pub use queries::{read_allowance, read_balance, read_permit2_allowance, Permit2Allowance};

use crate::statediff::StateOverrides;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

/// Trait for reading contract storage slots.
#[async_trait]
pub trait StorageReader: Send + Sync {
    /// Read the storage word at `slot` of `address` at the latest block.
    /// Slots that were never written read as zero.
    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, SourceError>;
}

/// Trait for executing read-only contract calls.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Call `to` with `input` at the latest block, with `overrides` applied to state if given.
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError>;
}

/// A data source that can both read storage and execute calls.
pub trait ChainReader: StorageReader + ContractCaller {}

impl<T: StorageReader + ContractCaller> ChainReader for T {}

#[async_trait]
impl<T: StorageReader + ?Sized> StorageReader for std::sync::Arc<T> {
    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, SourceError> {
        (**self).read_storage(address, slot).await
    }
}

#[async_trait]
impl<T: ContractCaller + ?Sized> ContractCaller for std::sync::Arc<T> {
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError> {
        (**self).call(to, input, overrides).await
    }
}
