//! Call descriptor handed to the VM

use bach_primitives::{Address, H256, U256};
use bytes::Bytes;

/// Kind of call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Message call (also used for static calls, see `VmMessage::is_static`)
    Call,
    /// Delegate call: callee code runs in the caller's context
    DelegateCall,
    /// Contract creation, address from (sender, nonce)
    Create,
    /// Contract creation, address from (sender, salt, init code hash)
    Create2,
}

impl CallKind {
    /// Whether this kind deploys a contract
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

/// Call descriptor passed to `Vm::execute` and `Host::call`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmMessage {
    /// Kind of call
    pub kind: CallKind,
    /// State modifications are forbidden
    pub is_static: bool,
    /// Call depth (0 for the outermost frame)
    pub depth: i32,
    /// Gas available to the callee
    pub gas: i64,
    /// Account whose storage and balance the code operates on
    pub recipient: Address,
    /// Caller
    pub sender: Address,
    /// Call data, or init code for creates
    pub input: Bytes,
    /// Value transferred
    pub value: U256,
    /// CREATE2 salt
    pub create2_salt: H256,
    /// Account whose code runs (differs from `recipient` for delegate calls)
    pub code_address: Address,
}

impl VmMessage {
    /// Plain CALL descriptor
    pub fn call(sender: Address, recipient: Address, gas: i64, value: U256, input: Bytes) -> Self {
        Self {
            kind: CallKind::Call,
            is_static: false,
            depth: 0,
            gas,
            recipient,
            sender,
            input,
            value,
            create2_salt: H256::ZERO,
            code_address: recipient,
        }
    }

    /// Builder-style depth setter
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Builder-style static flag setter
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_descriptor() {
        let sender = Address::from_bytes([0x11; 20]);
        let recipient = Address::from_bytes([0x22; 20]);
        let msg = VmMessage::call(sender, recipient, 100_000, U256::from(5u64), Bytes::from_static(b"\x01"))
            .with_depth(2)
            .with_static(true);

        assert_eq!(msg.kind, CallKind::Call);
        assert_eq!(msg.code_address, recipient);
        assert_eq!(msg.depth, 2);
        assert!(msg.is_static);
        assert!(msg.create2_salt.is_zero());
    }

    #[test]
    fn test_call_kind_is_create() {
        assert!(CallKind::Create.is_create());
        assert!(CallKind::Create2.is_create());
        assert!(!CallKind::Call.is_create());
        assert!(!CallKind::DelegateCall.is_create());
    }
}
