//! `0x..05`: modular exponentiation, priced per EIP-2565

use bach_primitives::U256;
use bytes::Bytes;
use num::{BigUint, One, Zero};
use std::cmp::max;

use super::{Precompile, PrecompileError};
use crate::error::ExecResult;
use crate::gas::Gas;

const MIN_GAS: u64 = 200;
const HEADER_LEN: usize = 96;

/// `base ^ exp % modulus` over big-endian operands
#[derive(Debug)]
pub struct Modexp;

/// Left-to-right binary exponentiation
pub fn modexp(mut base: BigUint, exp: &[u8], modulus: &BigUint) -> BigUint {
    // n^m % 0 || n^m % 1
    if *modulus <= BigUint::one() {
        return BigUint::zero();
    }

    let mut exp = exp.iter().skip_while(|d| **d == 0).peekable();

    // n^0 % m
    if exp.peek().is_none() {
        return BigUint::one();
    }

    if base.is_zero() {
        return BigUint::zero();
    }

    base %= modulus;
    if base.is_zero() {
        return BigUint::zero();
    }

    let mut result = BigUint::one();
    for digit in exp {
        let mut mask = 1u8 << 7;
        for _ in 0..8 {
            result = &result * &result % modulus;
            if digit & mask > 0 {
                result = result * &base % modulus;
            }
            mask >>= 1;
        }
    }
    result
}

struct Sizes {
    base: usize,
    exp: usize,
    modulus: usize,
}

fn read_sizes(input: &[u8]) -> Result<Sizes, PrecompileError> {
    if input.len() < HEADER_LEN {
        return Err(PrecompileError::InputLength {
            expected: HEADER_LEN,
            got: input.len(),
        });
    }

    let word = |i: usize| U256::from_big_endian(&input[32 * i..32 * (i + 1)]);
    let limit = U256::from(u16::MAX);
    let checked = |value: U256, name: &'static str| {
        if value > limit {
            Err(PrecompileError::SizeTooLarge(name))
        } else {
            Ok(value.as_usize())
        }
    };

    let sizes = Sizes {
        base: checked(word(0), "base")?,
        exp: checked(word(1), "exp")?,
        modulus: checked(word(2), "mod")?,
    };

    let expected = HEADER_LEN + sizes.base + sizes.exp + sizes.modulus;
    if input.len() != expected {
        return Err(PrecompileError::InputLength {
            expected,
            got: input.len(),
        });
    }
    Ok(sizes)
}

fn multiplication_complexity(base_len: u64, mod_len: u64) -> u64 {
    let words = max(base_len, mod_len).div_ceil(8);
    words * words
}

/// Iteration count from the exponent length and its first 32 bytes
fn iteration_count(exp_len: u64, exp_head: &[u8]) -> u64 {
    let head = U256::from_big_endian(exp_head);
    let bit_index = if head.is_zero() {
        0
    } else {
        (255 - head.leading_zeros()) as u64
    };
    let count = if exp_len <= 32 {
        bit_index
    } else {
        8 * (exp_len - 32) + bit_index
    };
    max(count, 1)
}

fn gas_cost(sizes: &Sizes, exp: &[u8]) -> u64 {
    let head = &exp[..exp.len().min(32)];
    let complexity = multiplication_complexity(sizes.base as u64, sizes.modulus as u64);
    let count = iteration_count(sizes.exp as u64, head);
    max(MIN_GAS, complexity.saturating_mul(count) / 3)
}

impl Precompile for Modexp {
    fn execute(&self, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        let sizes = read_sizes(input)?;

        let (base, rest) = input[HEADER_LEN..].split_at(sizes.base);
        let (exp, modulus) = rest.split_at(sizes.exp);

        gas.use_gas(gas_cost(&sizes, exp))?;

        let mut output = vec![0u8; sizes.modulus];
        let modulus = BigUint::from_bytes_be(modulus);
        if modulus <= BigUint::one() {
            return Ok(Bytes::from(output));
        }

        let result = modexp(BigUint::from_bytes_be(base), exp, &modulus).to_bytes_be();
        // the result is reduced mod the modulus, so it always fits
        let start = sizes.modulus.saturating_sub(result.len());
        output[start..].copy_from_slice(&result[result.len().saturating_sub(sizes.modulus)..]);
        Ok(Bytes::from(output))
    }
}
