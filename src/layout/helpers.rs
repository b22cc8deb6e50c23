use alloy_primitives::{Address, Keccak256, B256, U256};

/// Encode an address into a 32-byte word (left-padded), as `abi.encode(address)` does.
pub fn encode_address(addr: Address) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[12..32].copy_from_slice(addr.as_slice());
    B256::from(bytes)
}

/// Encode a declaration-order slot index into a 32-byte word, as `abi.encode(uint256)` does.
pub fn encode_index(index: u64) -> B256 {
    B256::from(U256::from(index).to_be_bytes())
}

/// Encode an unsigned integer into a big-endian storage word.
pub fn encode_u256(value: U256) -> B256 {
    B256::from(value.to_be_bytes())
}

/// Decode a storage word as a big-endian unsigned integer.
pub fn decode_u256(value: B256) -> U256 {
    U256::from_be_bytes(value.0)
}

/// `keccak256(first ++ second)` over two 32-byte words.
pub fn hash_pair(first: B256, second: B256) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(first.as_slice());
    hasher.update(second.as_slice());
    hasher.finalize()
}
