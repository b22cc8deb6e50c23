use super::{ContractCaller, SourceError, StorageReader};
use crate::statediff::StateOverrides;
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::Serialize;
use std::time::Duration;
use tracing::trace;

/// Block tag every read is pinned to.
const BLOCK_TAG: &str = "latest";

/// Minimal `eth_call` transaction object. No gas limit is sent, so the node applies its own cap.
#[derive(Debug, Clone, Serialize)]
struct CallRequest {
    to: Address,
    data: Bytes,
}

/// Reads storage and executes calls against an Ethereum JSON-RPC node over HTTP.
///
/// Each probe is a single `eth_getStorageAt`; oracle and verification queries are `eth_call`
/// with the state override map as the third parameter.
///
/// # Usage
/// ```ignore
/// let reader = RpcChainReader::connect("https://mainnet.example/rpc", Duration::from_secs(30))?;
/// let resolver = SlotResolver::new(reader, ResolverConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct RpcChainReader {
    client: HttpClient,
}

impl RpcChainReader {
    /// Build a reader for `url` with a per-request timeout.
    pub fn connect(url: &str, request_timeout: Duration) -> Result<Self, SourceError> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(url)
            .map_err(|e| SourceError::InvalidEndpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StorageReader for RpcChainReader {
    async fn read_storage(&self, address: Address, slot: B256) -> Result<B256, SourceError> {
        trace!(%address, %slot, "eth_getStorageAt");
        self.client
            .request("eth_getStorageAt", rpc_params![address, slot, BLOCK_TAG])
            .await
            .map_err(|source| SourceError::Rpc { method: "eth_getStorageAt", source })
    }
}

#[async_trait]
impl ContractCaller for RpcChainReader {
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        overrides: Option<&StateOverrides>,
    ) -> Result<Bytes, SourceError> {
        let request = CallRequest { to, data: input };
        trace!(%to, overrides = overrides.map_or(0, |o| o.total_slot_count()), "eth_call");
        let result: Result<Bytes, _> = match overrides {
            Some(overrides) => {
                self.client
                    .request("eth_call", rpc_params![request, BLOCK_TAG, overrides])
                    .await
            }
            None => self.client.request("eth_call", rpc_params![request, BLOCK_TAG]).await,
        };
        result.map_err(|source| SourceError::Rpc { method: "eth_call", source })
    }
}
