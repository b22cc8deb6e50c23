use slot_mocker::cli::{Cli, Command};
use slot_mocker::mock::MockData;
use slot_mocker::onchain::{Permit2Allowance, RpcChainReader};
use slot_mocker::output;
use slot_mocker::permit2;
use slot_mocker::resolver::SlotResolver;
use slot_mocker::statediff::StateOverrides;

use alloy_primitives::{Address, U256};
use clap::Parser;
use eyre::{bail, eyre, WrapErr};
use serde_json::json;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Resolver = SlotResolver<RpcChainReader>;

/// Main entry point for slot discovery and mock generation
#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.resolver_config()?;
    let max_slots = config.max_slots;
    let connect = || -> eyre::Result<Resolver> {
        let url =
            cli.rpc_url.as_deref().ok_or_else(|| eyre!("--rpc-url or ETH_RPC_URL is required"))?;
        let reader = RpcChainReader::connect(url, Duration::from_secs(cli.timeout))?;
        info!(url, max_slots, concurrency = config.probe_concurrency, "connected");
        Ok(SlotResolver::new(reader, config.clone()))
    };

    match cli.command.clone() {
        Command::BalanceSlot { token, holder } => {
            let resolver = connect()?;
            let slot = resolver
                .resolve_balance_slot(token, holder, max_slots)
                .await
                .wrap_err_with(|| format!("resolving balance slot of {token}"))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&slot)?);
            } else {
                output::print_balance_slot(&token, &holder, &slot);
                print_stats(&resolver);
            }
        }

        Command::ApprovalSlot { token, owner, spender, fallback } => {
            let resolver = connect()?;
            let slot = resolver
                .resolve_approval_slot(token, owner, spender, max_slots, fallback)
                .await
                .wrap_err_with(|| format!("resolving approval slot of {token}"))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&slot)?);
            } else {
                output::print_approval_slot(&token, &owner, &spender, &slot);
                print_stats(&resolver);
            }
        }

        Command::MockBalance { token, holder, mock, value, verify } => {
            let resolver = connect()?;
            let data = resolver
                .generate_mock_balance(token, holder, mock, value, max_slots)
                .await
                .wrap_err_with(|| format!("mocking balance of {mock} on {token}"))?;
            let overrides = data.into_overrides(token);
            let check = if verify.verify {
                Some((data.value(), resolver.read_balance(token, mock, Some(&overrides)).await?))
            } else {
                None
            };
            report_mock(cli.json, token, &data, &overrides, check)?;
        }

        Command::MockApproval { token, owner, spender, mock, value, fallback, verify } => {
            let resolver = connect()?;
            let data = resolver
                .generate_mock_approval(token, owner, spender, mock, value, max_slots, fallback)
                .await
                .wrap_err_with(|| format!("mocking approval of {mock} to {spender} on {token}"))?;
            let overrides = data.into_overrides(token);
            let check = if verify.verify {
                let read = resolver.read_allowance(token, mock, spender, Some(&overrides)).await?;
                Some((value, read))
            } else {
                None
            };
            report_mock(cli.json, token, &data, &overrides, check)?;
        }

        Command::Permit2Slot { owner, token, spender, amount, expiration, nonce, verify } => {
            let allowance = Permit2Allowance { amount, expiration, nonce };
            let data = permit2::generate_mock_permit2_approval(owner, token, spender, &allowance)?;
            let registry = config.permit2_address;
            let overrides = data.into_overrides(registry);
            let check = if verify.verify {
                let resolver = connect()?;
                let read =
                    resolver.read_permit2_allowance(owner, token, spender, Some(&overrides)).await?;
                if (read.expiration, read.nonce) != (expiration, nonce) {
                    bail!("Permit2 returned {read:?} under the override, expected {allowance:?}");
                }
                Some((amount, read.amount))
            } else {
                None
            };
            report_mock(cli.json, registry, &data, &overrides, check)?;
        }
    }

    Ok(())
}

fn init_tracing(log_json: bool) {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(log_json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!log_json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn print_stats(resolver: &Resolver) {
    output::print_cache_stats("balance", &resolver.balance_cache().stats());
    output::print_cache_stats("approval", &resolver.approval_cache().stats());
}

/// Print a generated override. `check` holds the expected and observed value when the
/// override was read back through `eth_call`.
fn report_mock(
    as_json: bool,
    contract: Address,
    data: &MockData,
    overrides: &StateOverrides,
    check: Option<(U256, U256)>,
) -> eyre::Result<()> {
    if as_json {
        let report = json!({
            "contract": contract,
            "mock": data,
            "stateOverrides": overrides,
            "observed": check.map(|(_, observed)| observed),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_mock(&contract, data);
        output::print_overrides(overrides)?;
        if let Some((expected, observed)) = check {
            output::print_verification(expected, observed);
        }
    }

    match check {
        Some((expected, observed)) if expected != observed => {
            bail!("override did not take effect: read {observed}, expected {expected}")
        }
        _ => Ok(()),
    }
}
