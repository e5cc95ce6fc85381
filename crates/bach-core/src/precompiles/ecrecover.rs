//! `0x..01`: secp256k1 public-key recovery

use bach_crypto::Signature;
use bach_primitives::H256;
use bytes::Bytes;

use super::Precompile;
use crate::error::ExecResult;
use crate::gas::Gas;

const ECRECOVER_GAS: u64 = 3000;

/// Recovers the signer of `(hash, v, r, s)`.
///
/// Input is zero-padded to 128 bytes. Any malformed signature yields the zero
/// word instead of an error.
#[derive(Debug)]
pub struct EcRecover;

impl EcRecover {
    fn recover(input: &[u8; 128]) -> Option<H256> {
        let (v_word, v) = (&input[32..63], input[63]);
        if v_word.iter().any(|b| *b != 0) {
            return None;
        }

        let hash = H256::from_slice(&input[..32]).ok()?;
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&input[64..96]);
        s.copy_from_slice(&input[96..128]);

        let signer = bach_crypto::ecrecover(&hash, &Signature::new(r, s, v)).ok()?;
        Some(signer.to_word())
    }
}

impl Precompile for EcRecover {
    fn execute(&self, input: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        gas.use_gas(ECRECOVER_GAS)?;

        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let word = Self::recover(&padded).unwrap_or_default();
        Ok(Bytes::copy_from_slice(word.as_bytes()))
    }
}
