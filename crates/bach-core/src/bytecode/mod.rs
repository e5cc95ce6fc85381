//! Bytecode contracts on an external VM
//!
//! The VM itself is a [`Vm`] implementation supplied by the node. This
//! module builds the VM message, meters the fixed call and creation costs,
//! maps the VM status back to [`ExecError`], and serves the VM's callbacks
//! through [`VmHost`].

mod host;

pub use host::{storage_status, VmHost};

use bach_abi::decode_revert_reason;
use bach_evm::{CallKind, Revision, StatusCode, Vm, VmMessage};
use bach_primitives::{Address, H256};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

use crate::account::ContractType;
use crate::address::{create2_address, create_address};
use crate::costs::{EVM_CONTRACT_CALL_COST, EVM_CONTRACT_CREATION_COST};
use crate::dispatcher::Dispatcher;
use crate::error::{ExecError, ExecResult};
use crate::executor::ContractExecutor;
use crate::gas::Gas;
use crate::message::{CallMessage, CallScheme, CreateInput, CreateMessage, Output};

/// Routes messages to the VM
#[derive(Clone)]
pub struct BytecodeExecutor {
    vm: Arc<dyn Vm>,
    revision: Revision,
}

impl fmt::Debug for BytecodeExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytecodeExecutor")
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl BytecodeExecutor {
    /// Executor running `vm` at the Cancun revision
    pub fn new(vm: Arc<dyn Vm>) -> Self {
        Self {
            vm,
            revision: Revision::Cancun,
        }
    }

    /// Run `code` for `message`, leaving the VM's gas-left in `gas`
    fn run(&self, dispatcher: &mut Dispatcher<'_>, message: &VmMessage, code: &[u8], gas: &mut Gas) -> ExecResult<Bytes> {
        let result = {
            let mut host = VmHost::new(dispatcher);
            self.vm.execute(&mut host, self.revision, message, code)
        };
        gas.set_remaining(u64::try_from(result.gas_left).unwrap_or(0));

        match result.status_code {
            StatusCode::Success => Ok(result.output),
            StatusCode::OutOfGas => Err(ExecError::OutOfGas),
            StatusCode::Revert => Err(ExecError::Reverted {
                reason: decode_revert_reason(&result.output),
                data: result.output,
            }),
            status => Err(ExecError::VmFailure {
                status,
                reason: decode_revert_reason(&result.output),
            }),
        }
    }
}

fn vm_depth(dispatcher: &Dispatcher<'_>) -> i32 {
    // the dispatcher counts the frame being executed
    i32::try_from(dispatcher.depth().saturating_sub(1)).unwrap_or(i32::MAX)
}

impl ContractExecutor for BytecodeExecutor {
    fn call(&self, dispatcher: &mut Dispatcher<'_>, scheme: CallScheme, message: CallMessage<'_>) -> ExecResult<Output> {
        let CallMessage {
            from,
            to,
            value,
            input,
            gas,
            code_address,
        } = message;

        gas.use_gas(EVM_CONTRACT_CALL_COST)?;
        let code = dispatcher.context().account(&code_address)?.code.clone();

        let vm_message = VmMessage {
            kind: match scheme {
                CallScheme::DelegateCall => CallKind::DelegateCall,
                CallScheme::Call | CallScheme::StaticCall => CallKind::Call,
            },
            is_static: dispatcher.is_static(),
            depth: vm_depth(dispatcher),
            gas: gas.as_vm_gas(),
            recipient: to,
            sender: from,
            input: input.to_bytes(),
            value,
            create2_salt: H256::ZERO,
            code_address,
        };

        let output = self.run(dispatcher, &vm_message, &code, gas)?;
        input.wrap_output(output)
    }

    fn create(&self, dispatcher: &mut Dispatcher<'_>, message: CreateMessage<'_>) -> ExecResult<Address> {
        let CreateMessage {
            from,
            value,
            input,
            gas,
        } = message;
        let (init_code, salt) = match input {
            CreateInput::Bytecode { init_code, salt } => (init_code, salt),
            CreateInput::Native { type_name, .. } => {
                return Err(ExecError::UnknownContractType(type_name));
            }
        };

        gas.use_gas(EVM_CONTRACT_CREATION_COST)?;

        let context = dispatcher.context_mut();
        context.create_account(&from);
        let nonce = context.account_mut(&from)?.increment_nonce();
        let address = match salt {
            Some(salt) => create2_address(&from, &salt, &init_code),
            None => create_address(&from, nonce),
        };

        if context.contract_type(&address).is_contract() || context.nonce(&address) > 0 {
            return Err(ExecError::ContractAlreadyExists(address));
        }
        context.create_account(&address);
        context.account_mut(&address)?.set_nonce(1);
        context.transfer_balance(&from, &address, value)?;

        let vm_message = VmMessage {
            kind: if salt.is_some() {
                CallKind::Create2
            } else {
                CallKind::Create
            },
            is_static: false,
            depth: vm_depth(dispatcher),
            gas: gas.as_vm_gas(),
            recipient: address,
            sender: from,
            input: init_code.clone(),
            value,
            create2_salt: salt.unwrap_or_default(),
            code_address: address,
        };

        let runtime = self.run(dispatcher, &vm_message, &init_code, gas)?;
        if runtime.is_empty() {
            return Err(ExecError::EmptyRuntimeCode);
        }

        let context = dispatcher.context_mut();
        {
            let mut account = context.account_mut(&address)?;
            account.set_code(runtime);
            account.set_contract_type(ContractType::Bytecode);
        }
        context.notify_new_contract(&address, ContractType::Bytecode, None);
        Ok(address)
    }
}
