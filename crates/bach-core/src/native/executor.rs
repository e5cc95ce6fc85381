//! Executor for native contracts

use bach_abi::{check_tokens, decode, encode, encode_function_call, split_selector, ParamType, Token};
use bach_primitives::{Address, U256};
use bytes::Bytes;

use super::manager::{ContractRegistry, CONTRACT_MANAGER_ADDRESS};
use super::{Method, NativeCall};
use crate::account::ContractType;
use crate::costs::{CPP_CONTRACT_CALL_COST, CPP_CONTRACT_CREATION_COST};
use crate::dispatcher::Dispatcher;
use crate::error::{ExecError, ExecResult};
use crate::executor::ContractExecutor;
use crate::gas::Gas;
use crate::message::{CallInput, CallMessage, CallScheme, CreateInput, CreateMessage, Output};

/// Routes messages to native contract instances
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeExecutor;

struct Invocation<'g> {
    caller: Address,
    address: Address,
    value: U256,
    input: CallInput,
    gas: &'g mut Gas,
}

impl NativeExecutor {
    /// Create a native executor
    pub fn new() -> Self {
        Self
    }

    /// Resolve the method, check value and mutability, run it
    fn invoke(&self, dispatcher: &mut Dispatcher<'_>, invocation: Invocation<'_>) -> ExecResult<Output> {
        let Invocation {
            caller,
            address,
            value,
            input,
            gas,
        } = invocation;

        let contract_type = dispatcher.context().contract_type(&address);
        if contract_type != ContractType::Native {
            return Err(ExecError::WrongContractType {
                address,
                reason: format!("expected native contract, found {:?}", contract_type),
            });
        }
        let contract = dispatcher.context().contract(&address)?;

        let (method, args, packed) = match input {
            CallInput::Packed { method, args, .. } => {
                let entry = contract
                    .method(&method)
                    .ok_or_else(|| ExecError::MethodNotFound(format!("{}.{}", contract.type_name(), method)))?;
                check_tokens(&entry.inputs, &args)?;
                (entry, args, true)
            }
            CallInput::Encoded(data) => {
                let (selector, body) = split_selector(&data)?;
                let entry = contract.method_by_selector(selector).ok_or_else(|| {
                    ExecError::MethodNotFound(format!(
                        "{} selector 0x{}",
                        contract.type_name(),
                        hex::encode(selector)
                    ))
                })?;
                let args = decode(&entry.inputs, body)?;
                (entry, args, false)
            }
        };

        let is_static = dispatcher.is_static();
        check_access(&method, !value.is_zero(), is_static)?;

        tracing::trace!("Native call {}.{} from {}", contract.type_name(), method.name, caller);

        let outputs = {
            let mut ctx = NativeCall::new(dispatcher, gas, caller, value, address, is_static);
            contract.call(&method.name, &mut ctx, args)?
        };

        if packed {
            Ok(Output::Tokens(outputs))
        } else {
            check_tokens(&method.outputs, &outputs)?;
            Ok(Output::Bytes(Bytes::from(encode(&outputs))))
        }
    }
}

fn check_access(method: &Method, has_value: bool, is_static: bool) -> ExecResult<()> {
    if has_value && !method.is_payable() {
        return Err(ExecError::NotPayable(method.name.clone()));
    }
    if is_static && !method.is_view() {
        return Err(ExecError::StaticCallViolation(format!(
            "{} is not a view method",
            method.name
        )));
    }
    Ok(())
}

impl ContractExecutor for NativeExecutor {
    fn call(&self, dispatcher: &mut Dispatcher<'_>, scheme: CallScheme, message: CallMessage<'_>) -> ExecResult<Output> {
        if scheme == CallScheme::DelegateCall {
            return Err(ExecError::DelegateCallToNative(message.code_address));
        }

        let cost = if message.to == CONTRACT_MANAGER_ADDRESS {
            CPP_CONTRACT_CREATION_COST
        } else {
            CPP_CONTRACT_CALL_COST
        };
        message.gas.use_gas(cost)?;

        self.invoke(
            dispatcher,
            Invocation {
                caller: message.from,
                address: message.to,
                value: message.value,
                input: message.input,
                gas: message.gas,
            },
        )
    }

    fn create(&self, dispatcher: &mut Dispatcher<'_>, message: CreateMessage<'_>) -> ExecResult<Address> {
        let CreateMessage {
            from,
            value,
            input,
            gas,
        } = message;
        let (type_name, args) = match input {
            CreateInput::Native { type_name, args } => (type_name, args),
            CreateInput::Bytecode { .. } => {
                return Err(ExecError::WrongContractType {
                    address: CONTRACT_MANAGER_ADDRESS,
                    reason: "bytecode creation routed to the native executor".to_string(),
                })
            }
        };

        gas.use_gas(CPP_CONTRACT_CREATION_COST)?;

        let manager = dispatcher.context().contract(&CONTRACT_MANAGER_ADDRESS)?;
        let factory = ContractRegistry::factory_method(&type_name);
        let method = manager
            .method(&factory)
            .ok_or_else(|| ExecError::UnknownContractType(type_name.clone()))?;
        check_tokens(&method.inputs, &args)?;

        let data = encode_function_call(method.selector(), &args);
        let output = self.invoke(
            dispatcher,
            Invocation {
                caller: from,
                address: CONTRACT_MANAGER_ADDRESS,
                value: U256::zero(),
                input: CallInput::Encoded(Bytes::from(data)),
                gas,
            },
        )?;

        let address = decode(&[ParamType::Address], &output.into_bytes())?
            .first()
            .and_then(Token::as_address)
            .ok_or_else(|| ExecError::UnknownContractType(type_name.clone()))?;

        dispatcher.context_mut().transfer_balance(&from, &address, value)?;
        Ok(address)
    }
}
