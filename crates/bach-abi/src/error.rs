//! ABI error types

use thiserror::Error;

/// ABI encoding/decoding error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Not enough bytes to decode the requested type
    #[error("insufficient data: need {need} bytes, have {have}")]
    InsufficientData {
        /// Bytes required
        need: usize,
        /// Bytes available
        have: usize,
    },

    /// Offset or length word does not fit in memory
    #[error("offset out of range at byte {0}")]
    OffsetOutOfRange(usize),

    /// String payload is not UTF-8
    #[error("invalid utf-8 string: {0}")]
    InvalidUtf8(String),

    /// Token does not match the parameter type
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Unknown or malformed type string
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Call data shorter than a selector
    #[error("call data has no selector")]
    MissingSelector,
}

/// Result type for ABI operations
pub type AbiResult<T> = Result<T, AbiError>;
