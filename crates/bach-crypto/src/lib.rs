//! # bach-crypto
//!
//! Cryptographic primitives for the BachLedger execution core.
//!
//! - Keccak-256, SHA-256 and RIPEMD-160 hashing
//! - secp256k1 signing and public key recovery
//! - Address derivation from public keys

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::{keccak256, ripemd160, sha256};
pub use signature::{
    ecrecover, public_key_to_address, recover_public_key, sign, PrivateKey, PublicKey, Signature,
};
