//! Nested call-tree recorder

use bach_primitives::{Address, U256};
use bytes::Bytes;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Call tracer misuse
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TracerError {
    /// `pop` or `root` without an open call
    #[error("call tracer not started")]
    NotStarted,
    /// `root` while calls are still open
    #[error("call tracer not finished, {0} calls open")]
    NotFinished(usize),
}

/// Kind of traced call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CallType {
    /// Plain call
    #[serde(rename = "CALL")]
    Call,
    /// Read-only call
    #[serde(rename = "STATICCALL")]
    StaticCall,
    /// Call running the callee's code in the caller's frame
    #[serde(rename = "DELEGATECALL")]
    DelegateCall,
    /// Contract creation
    #[serde(rename = "CREATE")]
    Create,
    /// Salted contract creation
    #[serde(rename = "CREATE2")]
    Create2,
}

/// Outcome of a traced call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "message")]
pub enum CallStatus {
    /// Not popped yet
    #[default]
    Pending,
    /// Returned normally
    Succeeded,
    /// Reverted by the callee
    ExecutionReverted,
    /// Ran out of gas
    OutOfGas,
    /// Failed for another reason
    Failed(String),
}

/// One node of the call tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Call kind
    #[serde(rename = "type")]
    pub call_type: CallType,
    /// Caller
    pub from: Address,
    /// Callee, or the created contract
    pub to: Address,
    /// Value sent
    #[serde(serialize_with = "quantity_u256")]
    pub value: U256,
    /// Gas available to the call
    #[serde(serialize_with = "quantity_u64")]
    pub gas: u64,
    /// Gas consumed by the call
    #[serde(serialize_with = "quantity_u64")]
    pub gas_used: u64,
    /// Call data
    #[serde(serialize_with = "hex_bytes")]
    pub input: Bytes,
    /// Return data
    #[serde(serialize_with = "hex_bytes")]
    pub output: Bytes,
    /// Outcome
    #[serde(flatten)]
    pub status: CallStatus,
    /// Nested calls in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<Call>,
}

impl Call {
    /// Open call with no outcome yet
    pub fn new(call_type: CallType, from: Address, to: Address, value: U256, gas: u64, input: Bytes) -> Self {
        Self {
            call_type,
            from,
            to,
            value,
            gas,
            gas_used: 0,
            input,
            output: Bytes::new(),
            status: CallStatus::Pending,
            calls: Vec::new(),
        }
    }
}

fn quantity_u64<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:#x}", value))
}

fn quantity_u256<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:#x}", value))
}

fn hex_bytes<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(value)))
}

/// Builds the call tree of one transaction.
///
/// `push` opens a call nested in the current one, `pop` closes it. Once the
/// outermost call is closed the tracer is finished and [`root`](Self::root)
/// returns the tree.
#[derive(Debug, Default)]
pub struct CallTracer {
    stack: Vec<Call>,
    root: Option<Call>,
}

impl CallTracer {
    /// Create an empty tracer
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a call
    pub fn push(&mut self, call: Call) {
        if self.stack.is_empty() {
            self.root = None;
        }
        self.stack.push(call);
    }

    /// Close the innermost open call
    pub fn pop(&mut self, output: Bytes, status: CallStatus, gas_used: u64) -> Result<(), TracerError> {
        let mut call = self.stack.pop().ok_or(TracerError::NotStarted)?;
        call.output = output;
        call.status = status;
        call.gas_used = gas_used;

        match self.stack.last_mut() {
            Some(parent) => parent.calls.push(call),
            None => self.root = Some(call),
        }
        Ok(())
    }

    /// Whether the outermost call is closed
    pub fn is_finished(&self) -> bool {
        self.stack.is_empty() && self.root.is_some()
    }

    /// Innermost open call
    pub fn current_mut(&mut self) -> Option<&mut Call> {
        self.stack.last_mut()
    }

    /// Number of open calls
    pub fn current_depth(&self) -> usize {
        self.stack.len()
    }

    /// The finished call tree
    pub fn root(&self) -> Result<&Call, TracerError> {
        if !self.stack.is_empty() {
            return Err(TracerError::NotFinished(self.stack.len()));
        }
        self.root.as_ref().ok_or(TracerError::NotStarted)
    }
}
