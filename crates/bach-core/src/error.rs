//! Execution error types

use bach_abi::AbiError;
use bach_evm::StatusCode;
use bach_primitives::{Address, U256};
use bytes::Bytes;
use thiserror::Error;

use crate::precompiles::PrecompileError;
use crate::tracer::TracerError;

/// Message execution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Gas debit exceeded the remaining budget
    #[error("out of gas")]
    OutOfGas,

    /// Callee requested an abort
    #[error("execution reverted{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    Reverted {
        /// Decoded `Error(string)` reason, if any
        reason: Option<String>,
        /// Raw revert data
        data: Bytes,
    },

    /// Bytecode VM reported a non-success, non-revert status
    #[error("vm execution failed with {status}{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    VmFailure {
        /// VM status
        status: StatusCode,
        /// Decoded reason, if the output carried one
        reason: Option<String>,
    },

    /// No native contract registered at the address
    #[error("contract not found: {0}")]
    ContractNotFound(Address),

    /// The account exists but is not the kind of contract the message needs
    #[error("wrong contract type at {address}: {reason}")]
    WrongContractType {
        /// Contract address
        address: Address,
        /// What was expected
        reason: String,
    },

    /// Account lookup failed
    #[error("account not found: {0}")]
    AccountNotFound(Address),

    /// Value transfer precondition failed
    #[error("insufficient balance at {address}: required {required}, available {available}")]
    InsufficientBalance {
        /// Debited account
        address: Address,
        /// Amount requested
        required: U256,
        /// Balance available
        available: U256,
    },

    /// A contract is already registered at the address
    #[error("contract already exists: {0}")]
    ContractAlreadyExists(Address),

    /// Call data sent to an account without code
    #[error("attempt to invoke non-contract {0}")]
    NotAContract(Address),

    /// Delegate calls cannot target native contracts
    #[error("delegate call not supported for native contract {0}")]
    DelegateCallToNative(Address),

    /// Value sent to a precompile
    #[error("precompiles do not accept value")]
    ValueToPrecompile,

    /// State modification attempted in a static call
    #[error("state modification in static call: {0}")]
    StaticCallViolation(String),

    /// Value sent to a non-payable method
    #[error("method {0} is not payable")]
    NotPayable(String),

    /// No method matches the name or selector
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Call nesting exceeded the configured depth
    #[error("call depth exceeded: {0}")]
    CallDepthExceeded(usize),

    /// Contract creation returned no runtime code
    #[error("contract creation returned empty code")]
    EmptyRuntimeCode,

    /// A native factory for the contract type is missing
    #[error("unknown native contract type: {0}")]
    UnknownContractType(String),

    /// Precompile rejected its input
    #[error("precompile error: {0}")]
    Precompile(#[from] PrecompileError),

    /// ABI encoding or decoding failed
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),

    /// Call tracer misuse
    #[error("tracer error: {0}")]
    Tracer(#[from] TracerError),
}

impl ExecError {
    /// Revert carrying an `Error(string)` reason
    pub fn revert(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        ExecError::Reverted {
            data: Bytes::from(bach_abi::encode_revert_reason(&reason)),
            reason: Some(reason),
        }
    }
}

/// Result type for execution operations
pub type ExecResult<T> = Result<T, ExecError>;
