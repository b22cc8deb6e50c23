//! Colored console output for slot-mocker.
//!
//! Color scheme: blue+bold headers, cyan values, green success,
//! yellow warnings, dimmed secondary text.

use crate::cache::CacheStats;
use crate::layout::LayoutConvention;
use crate::mock::MockData;
use crate::resolver::{ApprovalSlot, BalanceSlot};
use crate::statediff::StateOverrides;
use alloy_primitives::{Address, U256};
use colored::Colorize;

// ── Helpers ────────────────────────────────────────────────────────

/// Format a mapping location as `"slot 9 (solidity)"`.
pub fn format_slot(slot_index: u64, layout: LayoutConvention) -> String {
    format!("slot {slot_index} ({layout})")
}

/// Format a hit rate in `[0.0, 1.0]` as a percentage.
pub fn format_hit_rate(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

// ── Resolution Results ─────────────────────────────────────────────

/// Print a resolved balance mapping.
pub fn print_balance_slot(token: &Address, holder: &Address, slot: &BalanceSlot) {
    println!();
    println!("{}", "Balance slot:".blue().bold());
    println!("  {} {}", "Token:  ".dimmed(), format!("{token}").cyan());
    println!("  {} {}", "Holder: ".dimmed(), format!("{holder}").cyan());
    println!("  {} {}", "Mapping:".dimmed(), format_slot(slot.slot_index, slot.layout).cyan());
    println!("  {} {}", "Key:    ".dimmed(), format!("{}", slot.storage_key(*holder)).dimmed());
    println!("  {} {}", "Balance:".dimmed(), slot.balance.to_string().cyan());
}

/// Print a resolved allowance mapping.
pub fn print_approval_slot(
    token: &Address,
    owner: &Address,
    spender: &Address,
    slot: &ApprovalSlot,
) {
    println!();
    println!("{}", "Approval slot:".blue().bold());
    println!("  {} {}", "Token:    ".dimmed(), format!("{token}").cyan());
    println!("  {} {}", "Owner:    ".dimmed(), format!("{owner}").cyan());
    println!("  {} {}", "Spender:  ".dimmed(), format!("{spender}").cyan());
    println!("  {} {}", "Mapping:  ".dimmed(), format_slot(slot.slot_index, slot.layout).cyan());
    println!("  {} {}", "Slot hash:".dimmed(), format!("{}", slot.slot_hash).dimmed());
    println!("  {} {}", "Key:      ".dimmed(), format!("{}", slot.storage_key).dimmed());
    if !slot.verified {
        print_unverified_fallback(slot.slot_index);
    }
}

/// Print a warning that the fallback slot was assumed rather than matched.
pub fn print_unverified_fallback(slot_index: u64) {
    println!(
        "  {} slot {} is the fallback guess; nothing on chain confirmed it.",
        "WARNING:".yellow().bold(),
        slot_index.to_string().yellow()
    );
}

// ── Mock Overrides ─────────────────────────────────────────────────

/// Print one generated override entry.
pub fn print_mock(contract: &Address, mock: &MockData) {
    println!();
    println!("{}", "Mock override:".blue().bold());
    println!("  {} {}", "Contract:".dimmed(), format!("{contract}").cyan());
    println!("  {} {}", "Layout:  ".dimmed(), mock.layout.to_string().cyan());
    println!("  {} {}", "Key:     ".dimmed(), format!("{}", mock.override_key).cyan());
    println!("  {} {}", "Value:   ".dimmed(), format!("{}", mock.override_value).cyan());
    println!("  {} {}", "Decimal: ".dimmed(), mock.value().to_string().dimmed());
}

/// Print an override map as the JSON `eth_call` expects.
pub fn print_overrides(overrides: &StateOverrides) -> serde_json::Result<()> {
    println!();
    println!("{} {}", "State overrides:".blue().bold(), overrides.summary().dimmed());
    println!("{}", serde_json::to_string_pretty(overrides)?);
    Ok(())
}

/// Print the result of re-reading a value under the override.
pub fn print_verification(expected: U256, actual: U256) {
    if expected == actual {
        println!(
            "  {} eth_call with override returned {}",
            "OK".green().bold(),
            actual.to_string().cyan()
        );
    } else {
        println!(
            "  {} eth_call with override returned {} (expected {})",
            "MISMATCH".yellow().bold(),
            actual.to_string().yellow(),
            expected.to_string().dimmed()
        );
    }
}

// ── Cache ──────────────────────────────────────────────────────────

/// Print cache counters for one cache.
pub fn print_cache_stats(label: &str, stats: &CacheStats) {
    if stats.is_cold() {
        return;
    }
    println!(
        "  {} {} cache: {} hits, {} misses, {} entries ({})",
        "~".dimmed(),
        label,
        stats.hits.to_string().cyan(),
        stats.misses.to_string().cyan(),
        stats.current_entries.to_string().cyan(),
        format_hit_rate(stats.hit_rate()).dimmed(),
    );
}

// ── Tests ───────────────────────────────────────────────────────────
