//! secp256k1 signatures and public-key recovery

use bach_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

use crate::{keccak256, CryptoError};

/// Recoverable ECDSA signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// recovery id, 27 or 28
    pub v: u8,
}

/// Public key
pub type PublicKey = VerifyingKey;

/// Private key (32 bytes)
pub type PrivateKey = SigningKey;

impl Signature {
    /// Create signature from r, s, v components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Signature { r, s, v }
    }

    /// Recovery id as k256 expects it (0 or 1).
    ///
    /// Only the two canonical `v` values are accepted.
    pub fn recovery_id(&self) -> Result<RecoveryId, CryptoError> {
        match self.v {
            27 | 28 => RecoveryId::try_from(self.v - 27)
                .map_err(|_| CryptoError::InvalidRecoveryId(self.v)),
            other => Err(CryptoError::InvalidRecoveryId(other)),
        }
    }
}

/// Sign a message hash with a private key
pub fn sign(message_hash: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (signature, recovery_id) = private_key
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    Ok(Signature {
        r: signature.r().to_bytes().into(),
        s: signature.s().to_bytes().into(),
        v: recovery_id.to_byte() + 27,
    })
}

/// Recover the signer's public key from a signature and message hash
pub fn recover_public_key(
    message_hash: &H256,
    signature: &Signature,
) -> Result<PublicKey, CryptoError> {
    let recovery_id = signature.recovery_id()?;
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    let k256_sig = K256Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &k256_sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Derive an account address from a public key
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    // Uncompressed point is 0x04 || x || y; the address hashes x || y
    let encoded = public_key.to_encoded_point(false);
    Address::from_word(&keccak256(&encoded.as_bytes()[1..]))
}

/// Recover the signer address of `message_hash`
pub fn ecrecover(message_hash: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    recover_public_key(message_hash, signature).map(|key| public_key_to_address(&key))
}
