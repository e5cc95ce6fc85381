//! Precompiled contracts
//!
//! | Address | Contract | Gas |
//! |---------|----------|-----|
//! | `0x..01` | ecrecover | 3000 |
//! | `0x..02` | sha256 | 60 + 12 per word |
//! | `0x..03` | ripemd160 | 600 + 120 per word |
//! | `0x..04` | identity | 15 + 3 per word |
//! | `0x..05` | modexp | EIP-2565 |
//! | `0x..09` | blake2f | 1 per round |
//! | [`RANDOM_ADDRESS`] | random | 100 |

mod blake2f;
mod ecrecover;
mod hashing;
mod modexp;
mod random;

pub use blake2f::{compress, Blake2F};
pub use ecrecover::EcRecover;
pub use hashing::{Identity, Ripemd160, Sha256};
pub use modexp::{modexp, Modexp};
pub use random::RandomGen;

use bach_primitives::Address;
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;

use crate::error::ExecResult;
use crate::gas::Gas;

/// Address of the randomness precompile
pub const RANDOM_ADDRESS: Address = Address::from_bytes([
    0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x01,
]);

/// Gas charged by the randomness precompile
pub const RANDOM_GAS: u64 = 100;

/// Precompile input errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Input is not the size the contract requires
    #[error("invalid input length: expected {expected} bytes, got {got}")]
    InputLength {
        /// Required length
        expected: usize,
        /// Given length
        got: usize,
    },

    /// A modexp operand length does not fit in 16 bits
    #[error("modexp {0} size is too big")]
    SizeTooLarge(&'static str),

    /// blake2f final-block flag must be 0 or 1
    #[error("invalid blake2f final flag {0}")]
    InvalidFinalFlag(u8),

    /// No precompile at the address
    #[error("no precompile at {0}")]
    Unknown(Address),
}

/// A built-in contract.
///
/// Implementations charge their own gas before computing, so a budget too
/// small for the input fails without doing the work.
pub trait Precompile: Send + Sync {
    /// Run on `input`, debiting `gas`
    fn execute(&self, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes>;
}

/// Base cost plus a cost per 32-byte word of input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Linear {
    /// Base cost
    pub base: u64,
    /// Cost per word
    pub word: u64,
}

impl Linear {
    /// Pricer with the given base and word costs
    pub const fn new(base: u64, word: u64) -> Self {
        Self { base, word }
    }

    /// Cost of `len` bytes of input
    pub fn cost(&self, len: usize) -> u64 {
        let words = (len as u64).div_ceil(32);
        self.base.saturating_add(self.word.saturating_mul(words))
    }
}

/// Routes messages to the built-in contracts and owns the randomness source
pub struct PrecompiledExecutor {
    builtins: HashMap<Address, Box<dyn Precompile>>,
    random: RandomGen,
}

impl PrecompiledExecutor {
    /// Executor with the standard table, seeding the randomness source
    pub fn new(random: RandomGen) -> Self {
        let mut builtins: HashMap<Address, Box<dyn Precompile>> = HashMap::new();
        builtins.insert(Address::from_low_u64_be(1), Box::new(EcRecover));
        builtins.insert(Address::from_low_u64_be(2), Box::new(Sha256));
        builtins.insert(Address::from_low_u64_be(3), Box::new(Ripemd160));
        builtins.insert(Address::from_low_u64_be(4), Box::new(Identity));
        builtins.insert(Address::from_low_u64_be(5), Box::new(Modexp));
        builtins.insert(Address::from_low_u64_be(9), Box::new(Blake2F));
        Self { builtins, random }
    }

    /// Check if `address` is a precompile
    pub fn is_precompiled(&self, address: &Address) -> bool {
        *address == RANDOM_ADDRESS || self.builtins.contains_key(address)
    }

    /// Run the precompile at `address`
    pub fn execute(&mut self, address: &Address, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        if *address == RANDOM_ADDRESS {
            gas.use_gas(RANDOM_GAS)?;
            return Ok(Bytes::copy_from_slice(self.random.next_word().as_bytes()));
        }
        let builtin = self
            .builtins
            .get(address)
            .ok_or(PrecompileError::Unknown(*address))?;
        builtin.execute(input, gas)
    }

    /// Randomness source shared with native contracts
    pub fn random(&mut self) -> &mut RandomGen {
        &mut self.random
    }
}
