use alloy_primitives::{address, Address};

/// Default search ceiling for mapping declaration slots.
pub const DEFAULT_MAX_SLOTS: u64 = 30;
/// Declaration slot assumed for allowance mappings when the search has no signal.
pub const FALLBACK_APPROVAL_SLOT: u64 = 10;
/// Storage probes in flight at once during a search.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;
/// Canonical Permit2 deployment (same address on every chain).
pub const PERMIT2_ADDRESS: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");
/// Declaration slot of Permit2's `allowance` mapping (slot 0 is `nonceBitmap`).
pub const PERMIT2_ALLOWANCE_SLOT: u64 = 1;
