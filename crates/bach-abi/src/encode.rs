//! ABI encoding

use bach_primitives::U256;

use crate::error::{AbiError, AbiResult};
use crate::types::{ParamType, Token};

/// Encode tokens using their own types
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let types: Vec<ParamType> = tokens.iter().map(Token::type_of).collect();
    encode_params(&types, tokens)
}

/// Encode tokens against declared parameter types.
///
/// Fails if the token count or any token's shape does not match.
pub fn encode_with_types(types: &[ParamType], tokens: &[Token]) -> AbiResult<Vec<u8>> {
    check_tokens(types, tokens)?;
    Ok(encode_params(types, tokens))
}

/// Check tokens against parameter types
pub fn check_tokens(types: &[ParamType], tokens: &[Token]) -> AbiResult<()> {
    if types.len() != tokens.len() {
        return Err(AbiError::TypeMismatch {
            expected: format!("{} values", types.len()),
            got: format!("{} values", tokens.len()),
        });
    }
    for (param_type, token) in types.iter().zip(tokens) {
        if !param_type.matches(token) {
            return Err(AbiError::TypeMismatch {
                expected: param_type.to_string(),
                got: token.type_of().to_string(),
            });
        }
    }
    Ok(())
}

/// Encode function call (selector + params)
pub fn encode_function_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut result = selector.to_vec();
    result.extend(encode(tokens));
    result
}

/// Canonical signature `name(type1,type2)`
pub fn function_signature(name: &str, inputs: &[ParamType]) -> String {
    let args: Vec<String> = inputs.iter().map(ParamType::to_string).collect();
    format!("{}({})", name, args.join(","))
}

/// Compute function selector (first 4 bytes of keccak256(signature))
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = bach_crypto::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

fn encode_params(types: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let head_size: usize = types.iter().map(ParamType::head_len).sum();

    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.iter().zip(tokens) {
        if param_type.is_dynamic() {
            head.extend(encode_u256(U256::from(head_size + tail.len())));
            tail.extend(encode_token(param_type, token));
        } else {
            head.extend(encode_token(param_type, token));
        }
    }

    head.extend(tail);
    head
}

fn encode_token(param_type: &ParamType, token: &Token) -> Vec<u8> {
    match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => addr.to_word().as_bytes().to_vec(),
        (ParamType::Uint(_), Token::Uint(value)) => encode_u256(*value),
        (ParamType::Bool, Token::Bool(b)) => encode_u256(U256::from(*b as u8)),
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            let mut buf = [0u8; 32];
            let len = data.len().min(*size).min(32);
            buf[..len].copy_from_slice(&data[..len]);
            buf.to_vec()
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(tokens)) => {
            let mut result = encode_u256(U256::from(tokens.len()));
            let inner_types = vec![(**inner).clone(); tokens.len()];
            result.extend(encode_params(&inner_types, tokens));
            result
        }
        (ParamType::FixedArray(inner, _), Token::FixedArray(tokens)) => {
            let inner_types = vec![(**inner).clone(); tokens.len()];
            encode_params(&inner_types, tokens)
        }
        (ParamType::Tuple(types), Token::Tuple(tokens)) => encode_params(types, tokens),
        // mismatches are rejected by check_tokens before reaching here
        _ => vec![0u8; param_type.head_len()],
    }
}

fn encode_u256(value: U256) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes.to_vec()
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut result = encode_u256(U256::from(data.len()));
    let padded_len = data.len().div_ceil(32) * 32;
    result.extend_from_slice(data);
    result.resize(32 + padded_len, 0);
    result
}

/// Parse a Solidity type string (e.g. `uint256`, `address[]`, `bytes32[2]`)
pub fn parse_type(s: &str) -> AbiResult<ParamType> {
    let s = s.trim();

    if let Some(inner) = s.strip_suffix("[]") {
        return Ok(ParamType::Array(Box::new(parse_type(inner)?)));
    }
    if let Some(open) = s.rfind('[') {
        if let Some(size) = s[open + 1..].strip_suffix(']') {
            let size = size
                .parse()
                .map_err(|_| AbiError::UnknownType(s.to_string()))?;
            return Ok(ParamType::FixedArray(Box::new(parse_type(&s[..open])?), size));
        }
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        let bits = if rest.is_empty() {
            256
        } else {
            rest.parse().map_err(|_| AbiError::UnknownType(s.to_string()))?
        };
        if bits == 0 || bits > 256 || bits % 8 != 0 {
            return Err(AbiError::UnknownType(s.to_string()));
        }
        return Ok(ParamType::Uint(bits));
    }

    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest.parse().map_err(|_| AbiError::UnknownType(s.to_string()))?;
        if size == 0 || size > 32 {
            return Err(AbiError::UnknownType(s.to_string()));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(AbiError::UnknownType(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bach_primitives::Address;

    // ==================== Static values ====================

    #[test]
    fn test_encode_address() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        let encoded = encode(&[Token::Address(addr)]);
        assert_eq!(encoded.len(), 32);
        assert_eq!(&encoded[12..32], addr.as_bytes());
    }

    #[test]
    fn test_encode_bool_and_uint() {
        let encoded = encode(&[Token::Bool(true), Token::uint(100u64)]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 1);
        assert_eq!(encoded[63], 100);
    }

    // ==================== Dynamic values ====================

    #[test]
    fn test_encode_dynamic_bytes() {
        let data = vec![0x01, 0x02, 0x03];
        let encoded = encode(&[Token::Bytes(data.clone())]);

        // offset + length + one padded word
        assert_eq!(encoded.len(), 96);
        assert_eq!(encoded[31], 32);
        assert_eq!(encoded[63], 3);
        assert_eq!(&encoded[64..67], &data[..]);
    }

    #[test]
    fn test_encode_string_after_static() {
        let encoded = encode(&[Token::uint(7u64), Token::string("hi")]);
        // head: uint + offset(64), tail: length + data
        assert_eq!(encoded.len(), 128);
        assert_eq!(encoded[63], 64);
        assert_eq!(encoded[95], 2);
        assert_eq!(&encoded[96..98], b"hi");
    }

    // ==================== Signatures ====================

    #[test]
    fn test_function_selector() {
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
        assert_eq!(function_selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_function_signature() {
        let sig = function_signature("transfer", &[ParamType::Address, ParamType::Uint(256)]);
        assert_eq!(sig, "transfer(address,uint256)");
        assert_eq!(function_signature("getName", &[]), "getName()");
    }

    #[test]
    fn test_encode_with_types_rejects_mismatch() {
        let err = encode_with_types(&[ParamType::Address], &[Token::Bool(true)]).unwrap_err();
        assert!(matches!(err, AbiError::TypeMismatch { .. }));

        let err = encode_with_types(&[ParamType::Address], &[]).unwrap_err();
        assert!(matches!(err, AbiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("address").unwrap(), ParamType::Address);
        assert_eq!(parse_type("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(parse_type("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(
            parse_type("string[]").unwrap(),
            ParamType::Array(Box::new(ParamType::String))
        );
        assert_eq!(
            parse_type("address[2]").unwrap(),
            ParamType::FixedArray(Box::new(ParamType::Address), 2)
        );
        assert!(parse_type("uint7").is_err());
        assert!(parse_type("bytes33").is_err());
        assert!(parse_type("float").is_err());
    }
}
