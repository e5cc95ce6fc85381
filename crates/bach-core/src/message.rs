//! Messages routed by the dispatcher

use bach_abi::{decode, encode, encode_function_call, function_selector, function_signature, ParamType, Token};
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;

use crate::error::{ExecError, ExecResult};
use crate::gas::Gas;
use crate::tracer::CallType;

/// Call data of a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallInput {
    /// Method name with typed arguments, and the types the caller expects back
    Packed {
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Token>,
        /// Expected return types
        returns: Vec<ParamType>,
    },
    /// Raw ABI call data
    Encoded(Bytes),
}

impl CallInput {
    /// Packed call data
    pub fn packed(method: impl Into<String>, args: Vec<Token>, returns: Vec<ParamType>) -> Self {
        CallInput::Packed {
            method: method.into(),
            args,
            returns,
        }
    }

    /// Encoded call data
    pub fn encoded(data: impl Into<Bytes>) -> Self {
        CallInput::Encoded(data.into())
    }

    /// Whether this is a plain value transfer
    pub fn is_empty(&self) -> bool {
        matches!(self, CallInput::Encoded(data) if data.is_empty())
    }

    /// ABI call data: selector plus encoded arguments for packed input
    pub fn to_bytes(&self) -> Bytes {
        match self {
            CallInput::Packed { method, args, .. } => {
                let types: Vec<ParamType> = args.iter().map(Token::type_of).collect();
                let selector = function_selector(&function_signature(method, &types));
                Bytes::from(encode_function_call(selector, args))
            }
            CallInput::Encoded(data) => data.clone(),
        }
    }

    /// Shape raw return data the way the caller asked for it
    pub fn wrap_output(&self, output: Bytes) -> ExecResult<Output> {
        match self {
            CallInput::Packed { returns, .. } => Ok(Output::Tokens(decode(returns, &output)?)),
            CallInput::Encoded(_) => Ok(Output::Bytes(output)),
        }
    }
}

/// Constructor data of a create message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateInput {
    /// Native contract type with constructor arguments
    Native {
        /// Registered contract type name
        type_name: String,
        /// Constructor arguments
        args: Vec<Token>,
    },
    /// Bytecode init code, salted for CREATE2
    Bytecode {
        /// Init code
        init_code: Bytes,
        /// CREATE2 salt
        salt: Option<H256>,
    },
}

impl CreateInput {
    /// Trace type of the creation
    pub fn call_type(&self) -> CallType {
        match self {
            CreateInput::Bytecode { salt: Some(_), .. } => CallType::Create2,
            _ => CallType::Create,
        }
    }

    /// Bytes recorded as the creation input
    pub fn to_bytes(&self) -> Bytes {
        match self {
            CreateInput::Native { args, .. } => Bytes::from(encode(args)),
            CreateInput::Bytecode { init_code, .. } => init_code.clone(),
        }
    }
}

/// How a call message treats the callee's frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallScheme {
    /// Plain call
    Call,
    /// Read-only call
    StaticCall,
    /// Callee code runs against the caller's storage and identity
    DelegateCall,
}

impl CallScheme {
    /// Trace type of the scheme
    pub fn call_type(&self) -> CallType {
        match self {
            CallScheme::Call => CallType::Call,
            CallScheme::StaticCall => CallType::StaticCall,
            CallScheme::DelegateCall => CallType::DelegateCall,
        }
    }
}

/// A call, static call or delegate call
#[derive(Debug)]
pub struct CallMessage<'g> {
    /// Caller
    pub from: Address,
    /// Account whose storage and balance the call runs against
    pub to: Address,
    /// Value attached (not transferred for delegate calls)
    pub value: U256,
    /// Call data
    pub input: CallInput,
    /// Gas budget, borrowed for the duration of the call
    pub gas: &'g mut Gas,
    /// Account whose code runs; differs from `to` only for delegate calls
    pub code_address: Address,
}

/// A contract creation
#[derive(Debug)]
pub struct CreateMessage<'g> {
    /// Deployer
    pub from: Address,
    /// Value endowed to the new contract
    pub value: U256,
    /// Constructor data
    pub input: CreateInput,
    /// Gas budget, borrowed for the duration of the creation
    pub gas: &'g mut Gas,
}

/// A message for the dispatcher
#[derive(Debug)]
pub enum Message<'g> {
    /// Contract creation
    Create(CreateMessage<'g>),
    /// Plain call
    Call(CallMessage<'g>),
    /// Read-only call, value is always zero
    StaticCall(CallMessage<'g>),
    /// Delegate call
    DelegateCall(CallMessage<'g>),
}

impl<'g> Message<'g> {
    /// Plain call
    pub fn call(from: Address, to: Address, value: U256, input: CallInput, gas: &'g mut Gas) -> Self {
        Message::Call(CallMessage {
            from,
            to,
            value,
            input,
            gas,
            code_address: to,
        })
    }

    /// Read-only call
    pub fn static_call(from: Address, to: Address, input: CallInput, gas: &'g mut Gas) -> Self {
        Message::StaticCall(CallMessage {
            from,
            to,
            value: U256::zero(),
            input,
            gas,
            code_address: to,
        })
    }

    /// Run `code_address`'s code in the frame of `to`
    pub fn delegate_call(
        from: Address,
        to: Address,
        code_address: Address,
        value: U256,
        input: CallInput,
        gas: &'g mut Gas,
    ) -> Self {
        Message::DelegateCall(CallMessage {
            from,
            to,
            value,
            input,
            gas,
            code_address,
        })
    }

    /// Deploy bytecode
    pub fn create(from: Address, value: U256, init_code: Bytes, salt: Option<H256>, gas: &'g mut Gas) -> Self {
        Message::Create(CreateMessage {
            from,
            value,
            input: CreateInput::Bytecode { init_code, salt },
            gas,
        })
    }

    /// Deploy a registered native contract type
    pub fn create_native(
        from: Address,
        value: U256,
        type_name: impl Into<String>,
        args: Vec<Token>,
        gas: &'g mut Gas,
    ) -> Self {
        Message::Create(CreateMessage {
            from,
            value,
            input: CreateInput::Native {
                type_name: type_name.into(),
                args,
            },
            gas,
        })
    }

    /// Sender of the message
    pub fn from(&self) -> Address {
        match self {
            Message::Create(msg) => msg.from,
            Message::Call(msg) | Message::StaticCall(msg) | Message::DelegateCall(msg) => msg.from,
        }
    }

    /// Remaining gas of the message's budget
    pub fn gas_remaining(&self) -> u64 {
        match self {
            Message::Create(msg) => msg.gas.remaining(),
            Message::Call(msg) | Message::StaticCall(msg) | Message::DelegateCall(msg) => {
                msg.gas.remaining()
            }
        }
    }

    /// Debit the message's budget
    pub fn use_gas(&mut self, amount: u64) -> ExecResult<()> {
        match self {
            Message::Create(msg) => msg.gas.use_gas(amount),
            Message::Call(msg) | Message::StaticCall(msg) | Message::DelegateCall(msg) => {
                msg.gas.use_gas(amount)
            }
        }
    }
}

/// Result of a dispatched message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Raw return data, for encoded calls
    Bytes(Bytes),
    /// Decoded return values, for packed calls
    Tokens(Vec<Token>),
    /// Address of the created contract
    Address(Address),
}

impl Output {
    /// Return data as ABI bytes
    pub fn into_bytes(self) -> Bytes {
        match self {
            Output::Bytes(data) => data,
            Output::Tokens(tokens) => Bytes::from(encode(&tokens)),
            Output::Address(address) => Bytes::copy_from_slice(address.to_word().as_bytes()),
        }
    }

    /// Return values of a packed call
    pub fn into_tokens(self) -> ExecResult<Vec<Token>> {
        match self {
            Output::Tokens(tokens) => Ok(tokens),
            Output::Address(address) => Ok(vec![Token::Address(address)]),
            Output::Bytes(_) => Err(ExecError::MethodNotFound(
                "packed output requested from an encoded call".to_string(),
            )),
        }
    }

    /// Created contract address
    pub fn address(&self) -> Option<Address> {
        match self {
            Output::Address(address) => Some(*address),
            _ => None,
        }
    }
}
