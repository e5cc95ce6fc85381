//! Message dispatcher
//!
//! Every message runs inside its own checkpoint of the execution context:
//!
//! 1. check the call depth
//! 2. checkpoint, open a trace frame
//! 3. move call value (not for delegate calls)
//! 4. route to a precompile, the native executor or the bytecode executor
//! 5. keep the frame on success, roll it back on error
//!
//! Executors re-enter [`Dispatcher::dispatch`] for nested messages.

use bach_abi::encode;
use bach_evm::Vm;
use bach_primitives::{Address, H256};
use bytes::Bytes;
use std::sync::Arc;

use crate::account::ContractType;
use crate::bytecode::BytecodeExecutor;
use crate::config::ExecutionConfig;
use crate::context::ExecutionContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::ContractExecutor;
use crate::message::{CallInput, CallMessage, CallScheme, CreateInput, CreateMessage, Message, Output};
use crate::native::NativeExecutor;
use crate::precompiles::{PrecompiledExecutor, RandomGen};
use crate::tracer::{Call, CallStatus, CallTracer};

/// Routes messages for one transaction
pub struct Dispatcher<'a> {
    context: ExecutionContext<'a>,
    native: NativeExecutor,
    bytecode: BytecodeExecutor,
    precompiles: PrecompiledExecutor,
    tracer: Option<CallTracer>,
    depth: usize,
    max_depth: usize,
    is_static: bool,
}

impl<'a> Dispatcher<'a> {
    /// Dispatcher over `context`, running bytecode on `vm`.
    ///
    /// The random source is seeded from the configured seed and the
    /// transaction hash, so every transaction draws its own sequence.
    pub fn new(context: ExecutionContext<'a>, vm: Arc<dyn Vm>, config: &ExecutionConfig) -> Self {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(config.randomness_seed.as_bytes());
        preimage[32..].copy_from_slice(context.tx_hash().as_bytes());
        let seed: H256 = bach_crypto::keccak256(&preimage);

        Self {
            context,
            native: NativeExecutor::new(),
            bytecode: BytecodeExecutor::new(vm),
            precompiles: PrecompiledExecutor::new(RandomGen::new(seed)),
            tracer: config.tracing.then(CallTracer::new),
            depth: 0,
            max_depth: config.max_call_depth,
            is_static: false,
        }
    }

    /// Transaction state
    pub fn context(&self) -> &ExecutionContext<'a> {
        &self.context
    }

    /// Transaction state for update
    pub fn context_mut(&mut self) -> &mut ExecutionContext<'a> {
        &mut self.context
    }

    /// Precompiles and the random source
    pub fn precompiles_mut(&mut self) -> &mut PrecompiledExecutor {
        &mut self.precompiles
    }

    /// Call tracer, when tracing is enabled
    pub fn tracer(&self) -> Option<&CallTracer> {
        self.tracer.as_ref()
    }

    /// Number of frames currently executing
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the current frame runs inside a static call
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Dispatch a message
    pub fn dispatch(&mut self, message: Message<'_>) -> ExecResult<Output> {
        match message {
            Message::Create(message) => self.dispatch_create(message).map(Output::Address),
            Message::Call(message) => self.dispatch_call(CallScheme::Call, message),
            Message::StaticCall(message) => self.dispatch_call(CallScheme::StaticCall, message),
            Message::DelegateCall(message) => self.dispatch_call(CallScheme::DelegateCall, message),
        }
    }

    fn enter(&mut self) -> ExecResult<()> {
        if self.depth >= self.max_depth {
            return Err(ExecError::CallDepthExceeded(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn dispatch_call(&mut self, scheme: CallScheme, message: CallMessage<'_>) -> ExecResult<Output> {
        self.enter()?;

        let CallMessage {
            from,
            to,
            value,
            input,
            gas,
            code_address,
        } = message;
        let gas_before = gas.remaining();
        if let Some(tracer) = &mut self.tracer {
            tracer.push(Call::new(scheme.call_type(), from, to, value, gas_before, input.to_bytes()));
        }

        let checkpoint = self.context.checkpoint();
        let was_static = self.is_static;
        self.is_static = was_static || scheme == CallScheme::StaticCall;

        let result = self.route_call(
            scheme,
            CallMessage {
                from,
                to,
                value,
                input,
                gas: &mut *gas,
                code_address,
            },
        );

        self.is_static = was_static;
        self.depth -= 1;
        let gas_used = gas_before.saturating_sub(gas.remaining());

        match &result {
            Ok(_) => self.context.commit_checkpoint(checkpoint),
            Err(err) => {
                tracing::debug!("{:?} {} -> {} reverted: {}", scheme, from, to, err);
                self.context.revert_to(checkpoint);
            }
        }

        if let Some(tracer) = &mut self.tracer {
            let output = match &result {
                Ok(Output::Bytes(data)) => data.clone(),
                Ok(Output::Tokens(tokens)) => Bytes::from(encode(tokens)),
                Ok(Output::Address(_)) => Bytes::new(),
                Err(err) => failure_output(err),
            };
            tracer.pop(output, trace_status(&result), gas_used)?;
        }
        result
    }

    fn route_call(&mut self, scheme: CallScheme, message: CallMessage<'_>) -> ExecResult<Output> {
        tracing::debug!(
            "Dispatching {:?} {} -> {} (depth {}, gas {})",
            scheme,
            message.from,
            message.to,
            self.depth,
            message.gas.remaining()
        );

        if self.precompiles.is_precompiled(&message.code_address) {
            if scheme != CallScheme::DelegateCall && !message.value.is_zero() {
                return Err(ExecError::ValueToPrecompile);
            }
            let data = match &message.input {
                CallInput::Encoded(data) => data.clone(),
                CallInput::Packed { method, .. } => {
                    return Err(ExecError::MethodNotFound(format!(
                        "precompile {} has no method {}",
                        message.code_address, method
                    )))
                }
            };
            let output = self.precompiles.execute(&message.code_address, &data, message.gas)?;
            return Ok(Output::Bytes(output));
        }

        if scheme != CallScheme::DelegateCall && !message.value.is_zero() {
            if self.is_static {
                return Err(ExecError::StaticCallViolation("value transfer".to_string()));
            }
            self.context
                .transfer_balance(&message.from, &message.to, message.value)?;
        }

        match self.context.contract_type(&message.code_address) {
            ContractType::Native => {
                let executor = self.native;
                executor.call(self, scheme, message)
            }
            ContractType::Bytecode => {
                let executor = self.bytecode.clone();
                executor.call(self, scheme, message)
            }
            ContractType::NotAContract if message.input.is_empty() => Ok(Output::Bytes(Bytes::new())),
            ContractType::NotAContract => Err(ExecError::NotAContract(message.code_address)),
        }
    }

    fn dispatch_create(&mut self, message: CreateMessage<'_>) -> ExecResult<Address> {
        if self.is_static {
            return Err(ExecError::StaticCallViolation("contract creation".to_string()));
        }
        self.enter()?;

        let CreateMessage {
            from,
            value,
            input,
            gas,
        } = message;
        let gas_before = gas.remaining();
        if let Some(tracer) = &mut self.tracer {
            tracer.push(Call::new(input.call_type(), from, Address::ZERO, value, gas_before, input.to_bytes()));
        }

        tracing::debug!(
            "Dispatching {:?} from {} (depth {}, gas {})",
            input.call_type(),
            from,
            self.depth,
            gas_before
        );

        let checkpoint = self.context.checkpoint();
        let message = CreateMessage {
            from,
            value,
            input,
            gas: &mut *gas,
        };
        let result = if matches!(message.input, CreateInput::Native { .. }) {
            let executor = self.native;
            executor.create(self, message)
        } else {
            let executor = self.bytecode.clone();
            executor.create(self, message)
        };

        self.depth -= 1;
        let gas_used = gas_before.saturating_sub(gas.remaining());

        let output = match &result {
            Ok(address) => {
                self.context.commit_checkpoint(checkpoint);
                tracing::debug!("Created contract {} from {}", address, from);
                self.context
                    .account(address)
                    .map(|account| account.code.clone())
                    .unwrap_or_default()
            }
            Err(err) => {
                tracing::debug!("Create from {} reverted: {}", from, err);
                self.context.revert_to(checkpoint);
                failure_output(err)
            }
        };

        if let Some(tracer) = &mut self.tracer {
            if let (Ok(address), Some(call)) = (&result, tracer.current_mut()) {
                call.to = *address;
            }
            tracer.pop(output, trace_status(&result), gas_used)?;
        }
        result
    }
}

fn failure_output(err: &ExecError) -> Bytes {
    match err {
        ExecError::Reverted { data, .. } => data.clone(),
        _ => Bytes::new(),
    }
}

fn trace_status<T>(result: &ExecResult<T>) -> CallStatus {
    match result {
        Ok(_) => CallStatus::Succeeded,
        Err(ExecError::Reverted { .. }) => CallStatus::ExecutionReverted,
        Err(ExecError::OutOfGas) => CallStatus::OutOfGas,
        Err(err) => CallStatus::Failed(err.to_string()),
    }
}
