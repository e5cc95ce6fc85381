//! VM callbacks served from the dispatcher

use bach_evm::{AccessStatus, CallKind, Host, StatusCode, StorageStatus, TxContext, VmMessage, VmResult};
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;

use crate::dispatcher::Dispatcher;
use crate::error::{ExecError, ExecResult};
use crate::event::Event;
use crate::gas::Gas;
use crate::message::{CallInput, Message, Output};

/// Effect of writing `new` over `current` for a slot that held `original`
/// when the transaction started
pub fn storage_status(original: H256, current: H256, new: H256) -> StorageStatus {
    if current == new {
        return StorageStatus::Assigned;
    }

    if original == current {
        return if original.is_zero() {
            StorageStatus::Added
        } else if new.is_zero() {
            StorageStatus::Deleted
        } else {
            StorageStatus::Modified
        };
    }

    // slot already dirty in this transaction
    if original.is_zero() {
        if new.is_zero() {
            StorageStatus::AddedDeleted
        } else {
            StorageStatus::Assigned
        }
    } else if current.is_zero() {
        if new == original {
            StorageStatus::DeletedRestored
        } else {
            StorageStatus::DeletedAdded
        }
    } else if new.is_zero() {
        StorageStatus::ModifiedDeleted
    } else if new == original {
        StorageStatus::ModifiedRestored
    } else {
        StorageStatus::Assigned
    }
}

/// Outcome of a nested call as the VM sees it.
///
/// Only a revert hands back gas and data. Every other failure consumes the
/// whole budget of the call.
fn nested_result(result: ExecResult<Output>, gas_left: i64) -> VmResult {
    match result {
        Ok(Output::Address(address)) => VmResult {
            create_address: Some(address),
            ..VmResult::success(gas_left, Bytes::new())
        },
        Ok(output) => VmResult::success(gas_left, output.into_bytes()),
        Err(ExecError::Reverted { data, .. }) => VmResult::revert(gas_left, data),
        Err(ExecError::OutOfGas) => VmResult::failure(StatusCode::OutOfGas, 0),
        Err(ExecError::VmFailure { status, .. }) => VmResult::failure(status, 0),
        Err(err) => {
            tracing::debug!("Nested call failed: {}", err);
            VmResult::failure(StatusCode::Failure, 0)
        }
    }
}

/// [`Host`] adapter over the dispatcher.
///
/// Nested calls re-enter [`Dispatcher::dispatch`], so a bytecode contract
/// can call native contracts, precompiles and other bytecode alike.
pub struct VmHost<'d, 'a> {
    dispatcher: &'d mut Dispatcher<'a>,
}

impl<'d, 'a> VmHost<'d, 'a> {
    /// Host for one VM execution
    pub fn new(dispatcher: &'d mut Dispatcher<'a>) -> Self {
        Self { dispatcher }
    }

    fn nested_message<'g>(message: &VmMessage, gas: &'g mut Gas) -> Message<'g> {
        let input = CallInput::Encoded(message.input.clone());
        match message.kind {
            CallKind::Create | CallKind::Create2 => {
                let salt = (message.kind == CallKind::Create2).then_some(message.create2_salt);
                Message::create(message.sender, message.value, message.input.clone(), salt, gas)
            }
            CallKind::Call if message.is_static => {
                Message::static_call(message.sender, message.recipient, input, gas)
            }
            CallKind::Call => Message::call(message.sender, message.recipient, message.value, input, gas),
            CallKind::DelegateCall => Message::delegate_call(
                message.sender,
                message.recipient,
                message.code_address,
                message.value,
                input,
                gas,
            ),
        }
    }
}

impl Host for VmHost<'_, '_> {
    fn account_exists(&mut self, address: &Address) -> bool {
        self.dispatcher.context().account_exists(address)
    }

    fn get_storage(&mut self, address: &Address, key: &H256) -> H256 {
        self.dispatcher.context().retrieve(address, key)
    }

    fn set_storage(&mut self, address: &Address, key: &H256, value: &H256) -> StorageStatus {
        let context = self.dispatcher.context_mut();
        let current = context.retrieve(address, key);
        let original = context.original_storage(address, key);
        let status = storage_status(original, current, *value);
        if current != *value {
            context.store(address, *key, *value);
        }
        tracing::trace!("SSTORE {} {} -> {:?}", address, key, status);
        status
    }

    fn get_balance(&mut self, address: &Address) -> U256 {
        self.dispatcher.context().balance(address)
    }

    fn get_code_size(&mut self, address: &Address) -> usize {
        self.dispatcher
            .context()
            .account(address)
            .map(|account| account.code.len())
            .unwrap_or(0)
    }

    fn get_code_hash(&mut self, address: &Address) -> H256 {
        self.dispatcher
            .context()
            .account(address)
            .map(|account| account.code_hash)
            .unwrap_or(H256::ZERO)
    }

    fn copy_code(&mut self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize {
        let Ok(account) = self.dispatcher.context().account(address) else {
            return 0;
        };
        let code = account.code.get(code_offset..).unwrap_or_default();
        let len = code.len().min(buffer.len());
        buffer[..len].copy_from_slice(&code[..len]);
        len
    }

    fn selfdestruct(&mut self, address: &Address, _beneficiary: &Address) -> bool {
        tracing::warn!("Ignoring SELFDESTRUCT of {}", address);
        false
    }

    fn call(&mut self, message: &VmMessage) -> VmResult {
        tracing::trace!("VM {:?} from {} to {}", message.kind, message.sender, message.recipient);

        let mut gas = Gas::from_vm_gas(message.gas);
        let result = self.dispatcher.dispatch(Self::nested_message(message, &mut gas));
        nested_result(result, gas.as_vm_gas())
    }

    fn get_tx_context(&mut self) -> TxContext {
        self.dispatcher.context().env().tx_context()
    }

    fn get_block_hash(&mut self, number: u64) -> H256 {
        self.dispatcher.context().block_hash(number)
    }

    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[H256]) {
        let event = Event::log(*address, topics.to_vec(), Bytes::copy_from_slice(data));
        self.dispatcher.context_mut().add_event(event);
    }

    fn access_account(&mut self, _address: &Address) -> AccessStatus {
        AccessStatus::Warm
    }

    fn access_storage(&mut self, _address: &Address, _key: &H256) -> AccessStatus {
        AccessStatus::Warm
    }

    fn get_transient_storage(&mut self, address: &Address, key: &H256) -> H256 {
        self.dispatcher.context().retrieve_transient(address, key)
    }

    fn set_transient_storage(&mut self, address: &Address, key: &H256, value: &H256) {
        self.dispatcher.context_mut().store_transient(address, *key, *value);
    }
}
