//! Shared chain fixtures for resolver and mock tests.

use super::SlotResolver;
use crate::config::ResolverConfig;
use crate::constants::PERMIT2_ADDRESS;
use crate::layout::LayoutConvention;
use crate::onchain::{
    ContractCaller, InMemoryChain, RpcChainReader, SourceError, StorageReader, TokenLayout,
};
use crate::statediff::StateOverrides;
use alloy_primitives::{address, Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Solidity token with `balances` at 9 and `allowed` at 10 (USDC on Base).
pub const STANDARD_TOKEN: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
/// Vyper token with `balanceOf` at 3 and `allowance` at 4 (CRV on mainnet).
pub const REVERSED_TOKEN: Address = address!("D533a949740bb3306d119CC777fa900bA034cd52");
/// Token whose allowance mapping sits past the default search ceiling.
pub const DEEP_TOKEN: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

pub const HOLDER: Address = address!("0000c3Caa36E2d9A8CD5269C976eDe05018f0000");
pub const SPENDER: Address = PERMIT2_ADDRESS;
pub const OTHER: Address = address!("00000000000000000000000000000000000000aa");
pub const MOCK: Address = address!("00000000000000000000000000000000DeaDBeef");

pub const HOLDER_BALANCE: u64 = 8_600_000;
pub const HOLDER_ALLOWANCE: u64 = 1_000_000;

/// Both tokens deployed, `HOLDER` funded and approving `SPENDER`, Permit2 deployed.
pub fn chain() -> InMemoryChain {
    let chain = InMemoryChain::new();
    chain.deploy_token(STANDARD_TOKEN, TokenLayout::new(LayoutConvention::Standard, 9, 10));
    chain.deploy_token(REVERSED_TOKEN, TokenLayout::new(LayoutConvention::Reversed, 3, 4));
    chain.deploy_token(DEEP_TOKEN, TokenLayout::new(LayoutConvention::Standard, 2, 40));
    chain.deploy_permit2(PERMIT2_ADDRESS);

    for token in [STANDARD_TOKEN, REVERSED_TOKEN, DEEP_TOKEN] {
        chain.set_balance(token, HOLDER, U256::from(HOLDER_BALANCE));
        chain.set_allowance(token, HOLDER, SPENDER, U256::from(HOLDER_ALLOWANCE));
    }
    chain
}

pub fn resolver() -> SlotResolver<InMemoryChain> {
    SlotResolver::new(chain(), ResolverConfig::default())
}

/// Resolver against the node named by the env var `url_var`.
pub fn live_resolver(url_var: &str) -> SlotResolver<RpcChainReader> {
    let url = std::env::var(url_var).unwrap_or_else(|_| panic!("{url_var} not set"));
    let reader = RpcChainReader::connect(&url, Duration::from_secs(30)).unwrap();
    SlotResolver::new(reader, ResolverConfig::default())
}

/// The fixture chain with one storage read that fails.
///
/// The read numbered `fail_at` (counting from 1) returns an error; every other read and call is
/// served by the fixture chain.
#[derive(Debug)]
pub struct FailingChain {
    inner: InMemoryChain,
    fail_at: u64,
    reads: AtomicU64,
}

impl FailingChain {
    pub fn new(fail_at: u64) -> Self {
        Self { inner: chain(), fail_at, reads: AtomicU64::new(0) }
    }
}

#[async_trait]
impl StorageReader for FailingChain {
    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, SourceError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(SourceError::Reverted {
                contract: address,
                reason: "storage read failed".into(),
            });
        }
        self.inner.read_storage(address, slot).await
    }
}

#[async_trait]
impl ContractCaller for FailingChain {
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError> {
        self.inner.call(to, input, overrides).await
    }
}
