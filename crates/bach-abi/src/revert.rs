//! `Error(string)` revert payloads

use crate::decode::decode;
use crate::encode::encode_function_call;
use crate::types::{ParamType, Token};

/// Selector of `Error(string)`
pub const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Encode a revert reason the way Solidity's `revert("...")` does
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    encode_function_call(REVERT_SELECTOR, &[Token::string(reason)])
}

/// Extract the reason string from revert data.
///
/// Returns `None` when the data is not an `Error(string)` payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&REVERT_SELECTOR)?;
    match decode(&[ParamType::String], payload).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}
