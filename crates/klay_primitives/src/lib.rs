#![warn(missing_docs)]

//! Primitive types
//!
//! Byte, hash and integer types shared by the Klaytn transaction crates. They
//! are based on the same primitives as `alloy`.

pub use alloy_primitives::{
    Address, B256, Bytes, TxKind, U8, U64, U256, address, b256, bytes, hex, keccak256,
};

/// The highest address reserved for precompiled contracts.
pub const LAST_PRECOMPILED_CONTRACT_ADDRESS: Address =
    address!("0x00000000000000000000000000000000000003ff");

/// Returns whether the address falls in the range reserved for precompiled
/// contracts. The zero address is not a precompile.
pub fn is_precompiled_contract_address(address: &Address) -> bool {
    !address.is_zero() && *address <= LAST_PRECOMPILED_CONTRACT_ADDRESS
}

/// Computes the address of a contract created by `from` at `nonce`.
pub fn create_address(from: &Address, nonce: u64) -> Address {
    from.create(nonce)
}

/// Computes the Keccak-256 hash of the RLP encoding of `value`.
pub fn rlp_hash<T: alloy_rlp::Encodable + ?Sized>(value: &T) -> B256 {
    keccak256(alloy_rlp::encode(value))
}

/// Computes the Keccak-256 hash of the RLP encoding of `value`, prepended with
/// the provided prefix byte.
pub fn prefixed_rlp_hash<T: alloy_rlp::Encodable + ?Sized>(prefix: u8, value: &T) -> B256 {
    let mut buffer = Vec::with_capacity(1 + value.length());
    buffer.push(prefix);
    value.encode(&mut buffer);

    keccak256(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompiled_contract_address_range() {
        assert!(!is_precompiled_contract_address(&Address::ZERO));
        assert!(is_precompiled_contract_address(&address!(
            "0x0000000000000000000000000000000000000001"
        )));
        assert!(is_precompiled_contract_address(
            &LAST_PRECOMPILED_CONTRACT_ADDRESS
        ));
        assert!(!is_precompiled_contract_address(&address!(
            "0x0000000000000000000000000000000000000400"
        )));
        assert!(!is_precompiled_contract_address(&address!(
            "0xb94f5374fce5edbc8e2a8697c15331677e6ebf0b"
        )));
    }

    #[test]
    fn contract_address_derivation() {
        // Vector taken from go-ethereum's contract address tests.
        let from = address!("0x970e8128ab834e8eac17ab8e3812f010678cf791");
        assert_eq!(
            create_address(&from, 0),
            address!("0x333c3310824b7c685133f2bedb2ca4b8b4df633d")
        );
    }
}
