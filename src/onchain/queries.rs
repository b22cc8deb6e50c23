use super::abi::{IAllowanceTransfer, IERC20};
use super::{ContractCaller, SourceError};
use crate::statediff::StateOverrides;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use serde::{Deserialize, Serialize};

/// Allowance record held by the Permit2 registry for `(owner, token, spender)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit2Allowance {
    /// Approved amount (uint160)
    pub amount: U256,
    /// Expiry timestamp (uint48)
    pub expiration: u64,
    /// Signature nonce (uint48)
    pub nonce: u64,
}

/// Read `balanceOf(account)` on an ERC20 token.
pub async fn read_balance<C: ContractCaller + ?Sized>(
    caller: &C,
    token: Address,
    account: Address,
    overrides: Option<&StateOverrides>,
) -> Result<U256, SourceError> {
    let input = IERC20::balanceOfCall { account }.abi_encode();
    let output = caller.call(token, Bytes::from(input), overrides).await?;
    decode_word(token, "balanceOf", &output)
}

/// Read `allowance(owner, spender)` on an ERC20 token.
pub async fn read_allowance<C: ContractCaller + ?Sized>(
    caller: &C,
    token: Address,
    owner: Address,
    spender: Address,
    overrides: Option<&StateOverrides>,
) -> Result<U256, SourceError> {
    let input = IERC20::allowanceCall { owner, spender }.abi_encode();
    let output = caller.call(token, Bytes::from(input), overrides).await?;
    decode_word(token, "allowance", &output)
}

/// Read the Permit2 allowance of `spender` over `owner`'s `token`.
pub async fn read_permit2_allowance<C: ContractCaller + ?Sized>(
    caller: &C,
    registry: Address,
    owner: Address,
    token: Address,
    spender: Address,
    overrides: Option<&StateOverrides>,
) -> Result<Permit2Allowance, SourceError> {
    let input = IAllowanceTransfer::allowanceCall { owner, token, spender }.abi_encode();
    let output = caller.call(registry, Bytes::from(input), overrides).await?;
    let (amount, expiration, nonce) = <(U256, U256, U256)>::abi_decode(&output)
        .map_err(|e| decode_error(registry, "allowance", e))?;
    Ok(Permit2Allowance {
        amount,
        expiration: narrow(registry, expiration)?,
        nonce: narrow(registry, nonce)?,
    })
}

fn decode_word(
    contract: Address,
    function: &'static str,
    output: &[u8],
) -> Result<U256, SourceError> {
    U256::abi_decode(output).map_err(|e| decode_error(contract, function, e))
}

fn narrow(contract: Address, value: U256) -> Result<u64, SourceError> {
    u64::try_from(value).map_err(|_| SourceError::Decode {
        contract,
        function: "allowance",
        reason: format!("{value} does not fit in uint48"),
    })
}

fn decode_error(contract: Address, function: &'static str, err: impl ToString) -> SourceError {
    SourceError::Decode { contract, function, reason: err.to_string() }
}
