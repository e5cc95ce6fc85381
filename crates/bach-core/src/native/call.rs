//! Per-call context handed to native methods

use bach_abi::{ParamType, Token};
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;

use crate::context::ExecutionContext;
use crate::dispatcher::Dispatcher;
use crate::error::{ExecError, ExecResult};
use crate::event::Event;
use crate::gas::Gas;
use crate::message::{CallInput, Message, Output};
use crate::precompiles::RANDOM_GAS;

/// Result of a call whose failure the caller handles itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// Callee returned
    Returned(Output),
    /// Callee failed; its writes are already undone
    Failed(ExecError),
}

impl CallOutcome {
    /// Whether the callee returned
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Returned(_))
    }

    /// `Error(string)` reason of a revert
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            CallOutcome::Failed(ExecError::Reverted { reason, .. }) => reason.as_deref(),
            _ => None,
        }
    }

    /// Back into a result
    pub fn into_result(self) -> ExecResult<Output> {
        match self {
            CallOutcome::Returned(output) => Ok(output),
            CallOutcome::Failed(err) => Err(err),
        }
    }
}

/// What a native method sees of the message that invoked it.
///
/// Nested calls made through this handle run against the same gas budget
/// and are dispatched as static calls when the current frame is static.
pub struct NativeCall<'c, 'a> {
    dispatcher: &'c mut Dispatcher<'a>,
    gas: &'c mut Gas,
    caller: Address,
    value: U256,
    address: Address,
    is_static: bool,
}

impl<'c, 'a> NativeCall<'c, 'a> {
    pub(crate) fn new(
        dispatcher: &'c mut Dispatcher<'a>,
        gas: &'c mut Gas,
        caller: Address,
        value: U256,
        address: Address,
        is_static: bool,
    ) -> Self {
        Self {
            dispatcher,
            gas,
            caller,
            value,
            address,
            is_static,
        }
    }

    /// Handle for code running on behalf of `address`, sharing this budget
    pub(crate) fn nested(&mut self, address: Address, value: U256) -> NativeCall<'_, 'a> {
        NativeCall {
            dispatcher: &mut *self.dispatcher,
            gas: &mut *self.gas,
            caller: self.caller,
            value,
            address,
            is_static: self.is_static,
        }
    }

    /// Immediate caller
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Value sent with the call
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Address of the running contract
    pub fn address(&self) -> Address {
        self.address
    }

    /// Whether state modification is forbidden
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Gas left
    pub fn gas_left(&self) -> u64 {
        self.gas.remaining()
    }

    /// Charge gas
    pub fn use_gas(&mut self, amount: u64) -> ExecResult<()> {
        self.gas.use_gas(amount)
    }

    /// Read-only view of the transaction state
    pub fn context(&self) -> &ExecutionContext<'a> {
        self.dispatcher.context()
    }

    pub(crate) fn context_mut(&mut self) -> &mut ExecutionContext<'a> {
        self.dispatcher.context_mut()
    }

    fn ensure_mutable(&self, action: &str) -> ExecResult<()> {
        if self.is_static {
            return Err(ExecError::StaticCallViolation(action.to_string()));
        }
        Ok(())
    }

    // ==================== Storage ====================

    /// Read a slot of this contract's storage
    pub fn load(&self, key: H256) -> H256 {
        self.context().retrieve(&self.address, &key)
    }

    /// Write a slot of this contract's storage
    pub fn store(&mut self, key: H256, value: H256) -> ExecResult<()> {
        self.ensure_mutable("storage write")?;
        let address = self.address;
        self.context_mut().store(&address, key, value);
        Ok(())
    }

    /// Read a slot as an integer
    pub fn load_u256(&self, key: H256) -> U256 {
        self.load(key).to_u256()
    }

    /// Write an integer to a slot
    pub fn store_u256(&mut self, key: H256, value: U256) -> ExecResult<()> {
        self.store(key, H256::from_u256(value))
    }

    // ==================== Accounts ====================

    /// Balance of any account
    pub fn balance(&self, address: &Address) -> U256 {
        self.context().balance(address)
    }

    /// Balance of this contract
    pub fn self_balance(&self) -> U256 {
        self.balance(&self.address)
    }

    // ==================== Events ====================

    /// Emit an event from this contract
    pub fn emit(&mut self, name: impl Into<String>, topics: Vec<H256>, data: Bytes) -> ExecResult<()> {
        self.ensure_mutable("event emission")?;
        let event = Event::new(name, self.address, topics, data);
        self.context_mut().add_event(event);
        Ok(())
    }

    // ==================== Calls ====================

    fn dispatch_call(&mut self, to: Address, value: U256, input: CallInput) -> ExecResult<Output> {
        let message = if self.is_static {
            if !value.is_zero() {
                return Err(ExecError::StaticCallViolation("value transfer".to_string()));
            }
            Message::static_call(self.address, to, input, &mut *self.gas)
        } else {
            Message::call(self.address, to, value, input, &mut *self.gas)
        };
        self.dispatcher.dispatch(message)
    }

    /// Call a method with typed arguments, decoding the results as `returns`
    pub fn call(
        &mut self,
        to: Address,
        method: &str,
        args: Vec<Token>,
        returns: Vec<ParamType>,
    ) -> ExecResult<Vec<Token>> {
        self.call_with_value(to, U256::zero(), method, args, returns)
    }

    /// Typed call that also sends `value`
    pub fn call_with_value(
        &mut self,
        to: Address,
        value: U256,
        method: &str,
        args: Vec<Token>,
        returns: Vec<ParamType>,
    ) -> ExecResult<Vec<Token>> {
        self.dispatch_call(to, value, CallInput::packed(method, args, returns))?
            .into_tokens()
    }

    /// Typed read-only call
    pub fn static_call(
        &mut self,
        to: Address,
        method: &str,
        args: Vec<Token>,
        returns: Vec<ParamType>,
    ) -> ExecResult<Vec<Token>> {
        let message = Message::static_call(
            self.address,
            to,
            CallInput::packed(method, args, returns),
            &mut *self.gas,
        );
        self.dispatcher.dispatch(message)?.into_tokens()
    }

    /// Call with raw ABI data, returning raw output
    pub fn call_encoded(&mut self, to: Address, value: U256, data: Bytes) -> ExecResult<Bytes> {
        Ok(self.dispatch_call(to, value, CallInput::Encoded(data))?.into_bytes())
    }

    /// Send value without call data
    pub fn transfer(&mut self, to: Address, value: U256) -> ExecResult<()> {
        self.dispatch_call(to, value, CallInput::Encoded(Bytes::new()))
            .map(|_| ())
    }

    /// Call and keep going on failure.
    ///
    /// The callee's writes are undone when it fails; gas it spent stays spent.
    pub fn try_call(&mut self, to: Address, value: U256, input: CallInput) -> CallOutcome {
        match self.dispatch_call(to, value, input) {
            Ok(output) => CallOutcome::Returned(output),
            Err(err) => CallOutcome::Failed(err),
        }
    }

    // ==================== Creation ====================

    /// Deploy a registered native contract type
    pub fn create(&mut self, type_name: &str, args: Vec<Token>, value: U256) -> ExecResult<Address> {
        self.ensure_mutable("contract creation")?;
        let message = Message::create_native(self.address, value, type_name, args, &mut *self.gas);
        let output = self.dispatcher.dispatch(message)?;
        self.created_address(output)
    }

    /// Deploy bytecode, with CREATE2 addressing when `salt` is given
    pub fn create_bytecode(&mut self, init_code: Bytes, salt: Option<H256>, value: U256) -> ExecResult<Address> {
        self.ensure_mutable("contract creation")?;
        let message = Message::create(self.address, value, init_code, salt, &mut *self.gas);
        let output = self.dispatcher.dispatch(message)?;
        self.created_address(output)
    }

    fn created_address(&self, output: Output) -> ExecResult<Address> {
        output.address().ok_or_else(|| ExecError::WrongContractType {
            address: self.address,
            reason: "creation returned no address".to_string(),
        })
    }

    // ==================== Randomness ====================

    /// Next value of the transaction's random source
    pub fn random(&mut self) -> ExecResult<U256> {
        self.gas.use_gas(RANDOM_GAS)?;
        Ok(self.dispatcher.precompiles_mut().random().next_u256())
    }
}
