//! VM backend trait and its result

use bach_primitives::Address;
use bytes::Bytes;

use crate::host::Host;
use crate::message::VmMessage;
use crate::status::{Revision, StatusCode};

/// Result of one VM execution or one `Host::call`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmResult {
    /// Outcome
    pub status_code: StatusCode,
    /// Gas left after execution
    pub gas_left: i64,
    /// Gas refund accumulated by the callee
    pub gas_refund: i64,
    /// Return data (revert data on `Revert`)
    pub output: Bytes,
    /// Address of the deployed contract, for successful creates
    pub create_address: Option<Address>,
}

impl VmResult {
    /// Successful result with output
    pub fn success(gas_left: i64, output: Bytes) -> Self {
        Self {
            status_code: StatusCode::Success,
            gas_left,
            gas_refund: 0,
            output,
            create_address: None,
        }
    }

    /// Reverted result carrying revert data
    pub fn revert(gas_left: i64, output: Bytes) -> Self {
        Self {
            status_code: StatusCode::Revert,
            gas_left,
            gas_refund: 0,
            output,
            create_address: None,
        }
    }

    /// Failure with no output
    pub fn failure(status_code: StatusCode, gas_left: i64) -> Self {
        Self {
            status_code,
            gas_left,
            gas_refund: 0,
            output: Bytes::new(),
            create_address: None,
        }
    }
}

/// An external bytecode virtual machine
pub trait Vm: Send + Sync {
    /// Execute `code` for `message`, calling back into `host` for state.
    ///
    /// `gas_left` in the result is what remains of `message.gas`.
    fn execute(
        &self,
        host: &mut dyn Host,
        revision: Revision,
        message: &VmMessage,
        code: &[u8],
    ) -> VmResult;
}
