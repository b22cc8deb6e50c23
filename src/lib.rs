//! # slot-mocker - ERC20 storage slot discovery and state override generation
//!
//! Finds where a token keeps `balances` and `allowances` by matching raw storage against the
//! token's own getters, then builds `eth_call` state overrides that give any address a chosen
//! balance, allowance or Permit2 approval.

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod layout;
pub mod mock;
pub mod onchain;
pub mod output;
pub mod permit2;
pub mod resolver;
pub mod statediff;
