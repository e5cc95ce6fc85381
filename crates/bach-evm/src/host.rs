//! Callbacks the VM makes into the host

use bach_primitives::{Address, H256, U256};

use crate::context::TxContext;
use crate::message::VmMessage;
use crate::status::StorageStatus;
use crate::vm::VmResult;

/// EIP-2929 access status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessStatus {
    /// First access in the transaction
    Cold,
    /// Already accessed
    Warm,
}

/// Host side of the VM callback protocol.
///
/// All methods take `&mut self`: even reads may be journaled or traced by the
/// host, and `call` re-enters the whole dispatcher.
pub trait Host {
    /// Whether the account exists
    fn account_exists(&mut self, address: &Address) -> bool;

    /// Read a storage slot (zero when unset)
    fn get_storage(&mut self, address: &Address, key: &H256) -> H256;

    /// Write a storage slot
    fn set_storage(&mut self, address: &Address, key: &H256, value: &H256) -> StorageStatus;

    /// Account balance (zero for unknown accounts)
    fn get_balance(&mut self, address: &Address) -> U256;

    /// Size of the account's code
    fn get_code_size(&mut self, address: &Address) -> usize;

    /// Hash of the account's code (zero for unknown accounts)
    fn get_code_hash(&mut self, address: &Address) -> H256;

    /// Copy code starting at `code_offset` into `buffer`, returning bytes copied
    fn copy_code(&mut self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize;

    /// Destroy the account; returns whether it was registered for destruction
    fn selfdestruct(&mut self, address: &Address, beneficiary: &Address) -> bool;

    /// Nested call or create
    fn call(&mut self, message: &VmMessage) -> VmResult;

    /// Transaction and block environment
    fn get_tx_context(&mut self) -> TxContext;

    /// Hash of a recent block
    fn get_block_hash(&mut self, number: u64) -> H256;

    /// Emit a log
    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[H256]);

    /// Mark an account as accessed
    fn access_account(&mut self, address: &Address) -> AccessStatus;

    /// Mark a storage slot as accessed
    fn access_storage(&mut self, address: &Address, key: &H256) -> AccessStatus;

    /// Read transient storage (EIP-1153)
    fn get_transient_storage(&mut self, address: &Address, key: &H256) -> H256;

    /// Write transient storage (EIP-1153)
    fn set_transient_storage(&mut self, address: &Address, key: &H256, value: &H256);
}
