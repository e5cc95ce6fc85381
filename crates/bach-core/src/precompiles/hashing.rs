//! Hashing and identity precompiles

use bytes::Bytes;

use super::{Linear, Precompile};
use crate::error::ExecResult;
use crate::gas::Gas;

const SHA256_PRICE: Linear = Linear::new(60, 12);
const RIPEMD160_PRICE: Linear = Linear::new(600, 120);
const IDENTITY_PRICE: Linear = Linear::new(15, 3);

/// `0x..02`: SHA-256 digest
#[derive(Debug)]
pub struct Sha256;

impl Precompile for Sha256 {
    fn execute(&self, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        gas.use_gas(SHA256_PRICE.cost(input.len()))?;
        Ok(Bytes::copy_from_slice(bach_crypto::sha256(input).as_bytes()))
    }
}

/// `0x..03`: RIPEMD-160 digest, left-padded to 32 bytes
#[derive(Debug)]
pub struct Ripemd160;

impl Precompile for Ripemd160 {
    fn execute(&self, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        gas.use_gas(RIPEMD160_PRICE.cost(input.len()))?;
        let mut output = [0u8; 32];
        output[12..].copy_from_slice(&bach_crypto::ripemd160(input));
        Ok(Bytes::copy_from_slice(&output))
    }
}

/// `0x..04`: returns its input
#[derive(Debug)]
pub struct Identity;

impl Precompile for Identity {
    fn execute(&self, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        gas.use_gas(IDENTITY_PRICE.cost(input.len()))?;
        Ok(Bytes::copy_from_slice(input))
    }
}
