//! Permit2 allowance slots.
//!
//! Permit2 keeps `allowance[owner][token][spender]` at declaration slot 1 using Solidity
//! hashing, so the storage key is known without a search. The stored word packs three fields,
//! low bits first:
//!
//! ```text
//!   bits   0..160  amount      (uint160)
//!   bits 160..208  expiration  (uint48)
//!   bits 208..256  nonce       (uint48)
//! ```

use crate::constants::PERMIT2_ALLOWANCE_SLOT;
use crate::layout::{chained_mapping_slot, decode_u256, encode_u256, LayoutConvention};
use crate::mock::MockData;
use crate::onchain::Permit2Allowance;
use crate::resolver::SlotError;
use alloy_primitives::{Address, B256, U256};

const AMOUNT_BITS: usize = 160;
const EXPIRATION_BITS: usize = 48;
const NONCE_BITS: usize = 48;
const EXPIRATION_OFFSET: usize = AMOUNT_BITS;
const NONCE_OFFSET: usize = AMOUNT_BITS + EXPIRATION_BITS;

/// Storage key of `allowance[owner][token][spender]` inside Permit2.
pub fn compute_allowance_key(owner: Address, token: Address, spender: Address) -> B256 {
    chained_mapping_slot(&[owner, token, spender], PERMIT2_ALLOWANCE_SLOT)
}

fn mask(bits: usize) -> U256 {
    U256::MAX >> (256 - bits)
}

fn check_width(field: &'static str, value: U256, bits: usize) -> Result<(), SlotError> {
    if value > mask(bits) {
        return Err(SlotError::AmountOverflow { field, value, bits: bits as u32 });
    }
    Ok(())
}

/// Pack an allowance record into its storage word.
pub fn pack_allowance(allowance: &Permit2Allowance) -> Result<B256, SlotError> {
    let expiration = U256::from(allowance.expiration);
    let nonce = U256::from(allowance.nonce);
    check_width("amount", allowance.amount, AMOUNT_BITS)?;
    check_width("expiration", expiration, EXPIRATION_BITS)?;
    check_width("nonce", nonce, NONCE_BITS)?;

    let word = allowance.amount | (expiration << EXPIRATION_OFFSET) | (nonce << NONCE_OFFSET);
    Ok(encode_u256(word))
}

/// Split a storage word into its allowance fields.
pub fn unpack_allowance(word: B256) -> Permit2Allowance {
    let word = decode_u256(word);
    let field = |offset: usize, bits: usize| ((word >> offset) & mask(bits)).as_limbs()[0];
    Permit2Allowance {
        amount: word & mask(AMOUNT_BITS),
        expiration: field(EXPIRATION_OFFSET, EXPIRATION_BITS),
        nonce: field(NONCE_OFFSET, NONCE_BITS),
    }
}

/// Override data that makes Permit2 report `allowance` for `(owner, token, spender)`.
///
/// The key is fixed, so no chain access is needed. The result always uses the Solidity layout.
pub fn generate_mock_permit2_approval(
    owner: Address,
    token: Address,
    spender: Address,
    allowance: &Permit2Allowance,
) -> Result<MockData, SlotError> {
    Ok(MockData {
        override_key: compute_allowance_key(owner, token, spender),
        override_value: pack_allowance(allowance)?,
        layout: LayoutConvention::Standard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256};
    use alloy_sol_types::SolValue;

    const OWNER: Address = address!("0000c3Caa36E2d9A8CD5269C976eDe05018f0000");
    const TOKEN: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const SPENDER: Address = address!("3fC91A3afd70395Cd496C647d5a6CC9D4B2b7FAD");

    #[test]
    fn test_allowance_key_chains_three_levels() {
        let level1 = keccak256((OWNER, U256::from(1)).abi_encode());
        let level2 = keccak256((TOKEN, level1).abi_encode());
        let level3 = keccak256((SPENDER, level2).abi_encode());
        assert_eq!(compute_allowance_key(OWNER, TOKEN, SPENDER), level3);
    }

    #[test]
    fn test_allowance_key_is_deterministic_and_ordered() {
        let key = compute_allowance_key(OWNER, TOKEN, SPENDER);
        assert_eq!(key, compute_allowance_key(OWNER, TOKEN, SPENDER));
        assert_ne!(key, compute_allowance_key(SPENDER, TOKEN, OWNER));
    }

    #[test]
    fn test_pack_bit_layout() {
        let allowance = Permit2Allowance { amount: U256::from(5), expiration: 7, nonce: 9 };
        let word = decode_u256(pack_allowance(&allowance).unwrap());
        let expected = U256::from(5) | (U256::from(7) << 160) | (U256::from(9) << 208);
        assert_eq!(word, expected);
    }

    #[test]
    fn test_pack_then_unpack_preserves_fields_at_limits() {
        let allowance = Permit2Allowance {
            amount: mask(160),
            expiration: (1 << 48) - 1,
            nonce: 1,
        };
        let word = pack_allowance(&allowance).unwrap();
        assert_eq!(unpack_allowance(word), allowance);
    }

    #[test]
    fn test_pack_rejects_oversized_fields() {
        let amount = Permit2Allowance { amount: U256::from(1) << 160, ..Default::default() };
        assert!(matches!(
            pack_allowance(&amount),
            Err(SlotError::AmountOverflow { field: "amount", bits: 160, .. })
        ));

        let expiration = Permit2Allowance { expiration: 1 << 48, ..Default::default() };
        assert!(matches!(
            pack_allowance(&expiration),
            Err(SlotError::AmountOverflow { field: "expiration", .. })
        ));

        let nonce = Permit2Allowance { nonce: u64::MAX, ..Default::default() };
        assert!(matches!(
            pack_allowance(&nonce),
            Err(SlotError::AmountOverflow { field: "nonce", .. })
        ));
    }

    #[test]
    fn test_generate_mock_permit2_approval() {
        let allowance =
            Permit2Allowance { amount: U256::from(1_000_000u64), expiration: 0, nonce: 0 };
        let mock = generate_mock_permit2_approval(OWNER, TOKEN, SPENDER, &allowance).unwrap();
        assert_eq!(mock.override_key, compute_allowance_key(OWNER, TOKEN, SPENDER));
        assert_eq!(mock.override_value, encode_u256(U256::from(1_000_000u64)));
        assert_eq!(mock.layout, LayoutConvention::Standard);
    }
}
