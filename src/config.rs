use crate::constants::{
    DEFAULT_MAX_SLOTS, DEFAULT_PROBE_CONCURRENCY, FALLBACK_APPROVAL_SLOT, PERMIT2_ADDRESS,
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a [`ResolverConfig`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for this config
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Path that was parsed
        path: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Search and cache settings for a [`SlotResolver`](crate::resolver::SlotResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Highest declaration slot (exclusive) probed by default.
    pub max_slots: u64,
    /// Declaration slot assumed by the approval fallback.
    pub fallback_slot: u64,
    /// Storage probes in flight at once (1 = strictly sequential).
    pub probe_concurrency: usize,
    /// Seconds after which a discovered layout is searched for again (unset = never).
    pub record_ttl_secs: Option<u64>,
    /// Permit2 registry used for allowance reads.
    pub permit2_address: Address,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_SLOTS,
            fallback_slot: FALLBACK_APPROVAL_SLOT,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            record_ttl_secs: None,
            permit2_address: PERMIT2_ADDRESS,
        }
    }
}

impl ResolverConfig {
    /// Search up to 100 slots, for tokens with long inheritance chains.
    pub fn deep() -> Self {
        Self { max_slots: 100, ..Default::default() }
    }

    /// One probe at a time, for rate-limited endpoints.
    pub fn sequential() -> Self {
        Self { probe_concurrency: 1, ..Default::default() }
    }

    /// Record lifetime as a `Duration`.
    pub fn record_ttl(&self) -> Option<Duration> {
        self.record_ttl_secs.map(Duration::from_secs)
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path: display, source })
    }
}
