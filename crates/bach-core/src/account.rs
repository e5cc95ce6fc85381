//! Account data

use bach_primitives::{H256, U256};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Empty code hash (keccak256 of empty bytes)
pub const EMPTY_CODE_HASH: H256 = H256::from_bytes([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
    0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
    0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// How an account's code is executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Plain account, no code
    #[default]
    NotAContract,
    /// Compiled-in contract registered at the address
    Native,
    /// Bytecode run by the VM backend
    Bytecode,
}

impl ContractType {
    /// Whether the account can be called with input
    pub fn is_contract(&self) -> bool {
        !matches!(self, ContractType::NotAContract)
    }
}

/// Account state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account balance
    pub balance: U256,
    /// Account nonce
    pub nonce: u64,
    /// Execution model
    pub contract_type: ContractType,
    /// Runtime code, bytecode accounts only
    pub code: Bytes,
    /// keccak256 of `code`, or [`EMPTY_CODE_HASH`]
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            contract_type: ContractType::NotAContract,
            code: Bytes::new(),
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// Create a new empty account
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain account holding `balance`
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Check if account is empty (EIP-161)
    pub fn is_empty(&self) -> bool {
        self.nonce == 0
            && self.balance.is_zero()
            && self.contract_type == ContractType::NotAContract
    }
}
