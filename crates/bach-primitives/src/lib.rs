//! # bach-primitives
//!
//! Primitive types shared by the BachLedger execution core.
//!
//! - [`Address`]: 20-byte account address
//! - [`H256`]: 32-byte word used for hashes, storage slots and values
//! - [`U256`]: 256-bit unsigned integer (balances, call values)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

// Re-export primitive-types for U256
pub use primitive_types::U256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_word_address_agree() {
        let addr = Address::from_low_u64_be(0x0102);
        assert_eq!(addr.to_word().to_u256(), U256::from(0x0102u64));
    }
}
