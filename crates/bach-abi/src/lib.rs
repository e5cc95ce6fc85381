//! # bach-abi
//!
//! Solidity ABI encoding used at the boundary between native and bytecode
//! contracts.
//!
//! - Encoding and decoding of [`Token`] values against [`ParamType`]s
//! - Function signatures and 4-byte selectors
//! - `Error(string)` revert reasons
//!
//! # Example
//!
//! ```rust
//! use bach_abi::{decode, encode_function_call, function_selector, ParamType, Token};
//!
//! let selector = function_selector("setValue(uint256)");
//! let call = encode_function_call(selector, &[Token::uint(42u64)]);
//! let args = decode(&[ParamType::Uint(256)], &call[4..]).unwrap();
//! assert_eq!(args, vec![Token::uint(42u64)]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod decode;
mod encode;
mod error;
mod revert;
mod types;

pub use decode::{decode, split_selector};
pub use encode::{
    check_tokens, encode, encode_function_call, encode_with_types, function_selector,
    function_signature, parse_type,
};
pub use error::{AbiError, AbiResult};
pub use revert::{decode_revert_reason, encode_revert_reason, REVERT_SELECTOR};
pub use types::{ParamType, Token};
