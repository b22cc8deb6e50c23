use crate::config::{ConfigError, ResolverConfig};
use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for slot discovery and mock override generation
#[derive(Parser, Debug)]
#[command(
    name = "slot-mocker",
    about = "Find ERC20 balance/allowance storage slots and build eth_call state overrides"
)]
pub struct Cli {
    /// JSON-RPC endpoint used for eth_getStorageAt and eth_call.
    #[arg(long, env = "ETH_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// JSON file with resolver settings (maxSlots, fallbackSlot, probeConcurrency, ...).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Highest declaration slot (exclusive) to search. Overrides the config file.
    #[arg(long, global = true)]
    pub max_slots: Option<u64>,

    /// Storage probes in flight at once. Set to 1 for rate-limited endpoints.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value = "30", global = true)]
    pub timeout: u64,

    /// Enable structured JSON logging instead of human-readable output.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Find where a token stores balances, using a holder with a nonzero balance.
    BalanceSlot {
        token: Address,
        holder: Address,
    },

    /// Find where a token stores allowances, using an existing approval.
    ApprovalSlot {
        token: Address,
        owner: Address,
        spender: Address,
        /// Assume the fallback slot when the allowance is zero or no slot matches.
        #[arg(long)]
        fallback: bool,
    },

    /// Build an override giving `mock` a balance of `token`.
    MockBalance {
        token: Address,
        holder: Address,
        mock: Address,
        /// Balance to inject (defaults to the holder's balance).
        #[arg(long)]
        value: Option<U256>,
        #[command(flatten)]
        verify: VerifyArgs,
    },

    /// Build an override making `token` report allowance(mock, spender) == value.
    MockApproval {
        token: Address,
        owner: Address,
        spender: Address,
        mock: Address,
        value: U256,
        /// Assume the fallback slot when the allowance is zero or no slot matches.
        #[arg(long)]
        fallback: bool,
        #[command(flatten)]
        verify: VerifyArgs,
    },

    /// Build an override setting a Permit2 allowance (fixed slot, no search).
    Permit2Slot {
        owner: Address,
        token: Address,
        spender: Address,
        /// Approved amount (uint160).
        amount: U256,
        /// Expiry timestamp (uint48).
        #[arg(long, default_value = "0")]
        expiration: u64,
        /// Signature nonce (uint48).
        #[arg(long, default_value = "0")]
        nonce: u64,
        #[command(flatten)]
        verify: VerifyArgs,
    },
}

#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyArgs {
    /// Re-read the value through eth_call with the override applied.
    #[arg(long)]
    pub verify: bool,
}

impl Cli {
    /// Resolver settings: config file (or defaults) with CLI flags applied on top.
    pub fn resolver_config(&self) -> Result<ResolverConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::load(path)?,
            None => ResolverConfig::default(),
        };
        if let Some(max_slots) = self.max_slots {
            config.max_slots = max_slots;
        }
        if let Some(concurrency) = self.concurrency {
            config.probe_concurrency = concurrency;
        }
        Ok(config)
    }
}
