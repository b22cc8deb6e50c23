use alloy_primitives::Address;
use thiserror::Error;

/// Failures of the chain data source (RPC node or in-memory state).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The endpoint could not be configured.
    #[error("invalid rpc endpoint {url}: {reason}")]
    InvalidEndpoint {
        /// The endpoint as given
        url: String,
        /// Why the client rejected it
        reason: String,
    },

    /// A JSON-RPC request failed (transport, timeout or node error).
    #[error("{method} failed: {source}")]
    Rpc {
        /// The JSON-RPC method
        method: &'static str,
        /// Underlying client error
        #[source]
        source: jsonrpsee::core::ClientError,
    },

    /// A contract returned data that does not decode as the expected type.
    #[error("could not decode {function} result from {contract}: {reason}")]
    Decode {
        /// Contract that was called
        contract: Address,
        /// Function whose return data was malformed
        function: &'static str,
        /// Decoder message
        reason: String,
    },

    /// The call reverted or the target has no code.
    #[error("call to {contract} reverted: {reason}")]
    Reverted {
        /// Contract that was called
        contract: Address,
        /// Revert reason, if any
        reason: String,
    },
}
