//! ABI decoding

use bach_primitives::{Address, H256, U256};

use crate::error::{AbiError, AbiResult};
use crate::types::{ParamType, Token};

/// Decode tokens from ABI-encoded data
pub fn decode(types: &[ParamType], data: &[u8]) -> AbiResult<Vec<Token>> {
    decode_params(types, data)
}

/// Split call data into its selector and argument bytes
pub fn split_selector(data: &[u8]) -> AbiResult<([u8; 4], &[u8])> {
    if data.len() < 4 {
        return Err(AbiError::MissingSelector);
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Ok((selector, &data[4..]))
}

// Offsets of dynamic members are relative to the start of `data`, the
// enclosing parameter block.
fn decode_params(types: &[ParamType], data: &[u8]) -> AbiResult<Vec<Token>> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut head = 0;

    for param_type in types {
        let token = if param_type.is_dynamic() {
            let offset = read_usize(data, head)?;
            let tail = data
                .get(offset..)
                .ok_or(AbiError::OffsetOutOfRange(head))?;
            decode_dynamic(param_type, tail)?
        } else {
            decode_static(param_type, data, head)?
        };
        tokens.push(token);
        head += param_type.head_len();
    }

    Ok(tokens)
}

fn decode_static(param_type: &ParamType, data: &[u8], at: usize) -> AbiResult<Token> {
    match param_type {
        ParamType::Address => Ok(Token::Address(Address::from_word(&read_word(data, at)?))),
        ParamType::Uint(_) => Ok(Token::Uint(read_word(data, at)?.to_u256())),
        ParamType::Bool => Ok(Token::Bool(!read_word(data, at)?.is_zero())),
        ParamType::FixedBytes(size) => {
            let word = read_word(data, at)?;
            Ok(Token::FixedBytes(word.as_bytes()[..(*size).min(32)].to_vec()))
        }
        ParamType::FixedArray(inner, size) => {
            let types = vec![(**inner).clone(); *size];
            let block = data.get(at..).ok_or(AbiError::OffsetOutOfRange(at))?;
            Ok(Token::FixedArray(decode_params(&types, block)?))
        }
        ParamType::Tuple(types) => {
            let block = data.get(at..).ok_or(AbiError::OffsetOutOfRange(at))?;
            Ok(Token::Tuple(decode_params(types, block)?))
        }
        // dynamic types never reach decode_static
        _ => decode_dynamic(param_type, data.get(at..).unwrap_or_default()),
    }
}

fn decode_dynamic(param_type: &ParamType, data: &[u8]) -> AbiResult<Token> {
    match param_type {
        ParamType::Bytes => Ok(Token::Bytes(read_bytes(data)?.to_vec())),
        ParamType::String => {
            let bytes = read_bytes(data)?.to_vec();
            String::from_utf8(bytes)
                .map(Token::String)
                .map_err(|e| AbiError::InvalidUtf8(e.to_string()))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, 0)?;
            // every element needs at least one word
            check_length(data, 32usize.saturating_add(len.saturating_mul(32)))?;
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_params(&types, &data[32..])?))
        }
        ParamType::FixedArray(inner, size) => {
            let types = vec![(**inner).clone(); *size];
            Ok(Token::FixedArray(decode_params(&types, data)?))
        }
        ParamType::Tuple(types) => Ok(Token::Tuple(decode_params(types, data)?)),
        _ => decode_static(param_type, data, 0),
    }
}

fn read_word(data: &[u8], at: usize) -> AbiResult<H256> {
    let end = at.checked_add(32).ok_or(AbiError::OffsetOutOfRange(at))?;
    check_length(data, end)?;
    H256::from_slice(&data[at..end]).map_err(|_| AbiError::OffsetOutOfRange(at))
}

fn read_usize(data: &[u8], at: usize) -> AbiResult<usize> {
    let value = read_word(data, at)?.to_u256();
    if value > U256::from(u32::MAX) {
        return Err(AbiError::OffsetOutOfRange(at));
    }
    Ok(value.as_usize())
}

fn read_bytes(data: &[u8]) -> AbiResult<&[u8]> {
    let len = read_usize(data, 0)?;
    check_length(data, 32 + len)?;
    Ok(&data[32..32 + len])
}

fn check_length(data: &[u8], need: usize) -> AbiResult<()> {
    if data.len() < need {
        return Err(AbiError::InsufficientData {
            need,
            have: data.len(),
        });
    }
    Ok(())
}
