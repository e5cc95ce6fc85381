//! Fixed gas charges of the contract host

/// Charged once per transaction before dispatch
pub const CONTRACT_EXECUTION_COST: u64 = 21_000;

/// Native contract method call
pub const CPP_CONTRACT_CALL_COST: u64 = 1_000;

/// Native contract deployment
pub const CPP_CONTRACT_CREATION_COST: u64 = 50_000;

/// Bytecode contract call
pub const EVM_CONTRACT_CALL_COST: u64 = 5_000;

/// Bytecode contract deployment
pub const EVM_CONTRACT_CREATION_COST: u64 = 100_000;
