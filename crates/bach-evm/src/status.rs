//! VM outcome codes

use thiserror::Error;

/// Outcome of a VM execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StatusCode {
    /// Execution finished with success
    #[error("success")]
    Success,
    /// Generic execution failure
    #[error("failure")]
    Failure,
    /// Execution terminated with REVERT opcode
    #[error("revert")]
    Revert,
    /// The execution has run out of gas
    #[error("out of gas")]
    OutOfGas,
    /// Invalid instruction encountered
    #[error("invalid instruction")]
    InvalidInstruction,
    /// Undefined instruction encountered
    #[error("undefined instruction")]
    UndefinedInstruction,
    /// Stack overflow
    #[error("stack overflow")]
    StackOverflow,
    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,
    /// Jump to an invalid destination
    #[error("bad jump destination")]
    BadJumpDestination,
    /// Memory access out of bounds
    #[error("invalid memory access")]
    InvalidMemoryAccess,
    /// Call depth exceeded the limit
    #[error("call depth exceeded")]
    CallDepthExceeded,
    /// State modification attempted in a static call
    #[error("static mode violation")]
    StaticModeViolation,
    /// An argument to the VM is out of range
    #[error("argument out of range")]
    ArgumentOutOfRange,
    /// Insufficient balance for a value transfer
    #[error("insufficient balance")]
    InsufficientBalance,
    /// Internal VM error
    #[error("internal error")]
    InternalError,
}

impl StatusCode {
    /// Whether the execution succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

/// Effect of a storage write, used by the VM to charge gas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageStatus {
    /// Value unchanged (or a dirty slot rewritten)
    Assigned,
    /// Zero slot set to non-zero for the first time in the transaction
    Added,
    /// Non-zero slot cleared
    Deleted,
    /// Non-zero slot changed to another non-zero value
    Modified,
    /// Slot cleared then set again
    DeletedAdded,
    /// Modified slot cleared
    ModifiedDeleted,
    /// Added slot cleared
    AddedDeleted,
    /// Cleared slot restored to its original value
    DeletedRestored,
    /// Added slot restored to zero
    AddedRestored,
    /// Modified slot restored to its original value
    ModifiedRestored,
}

/// Protocol revision the VM should follow
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Revision {
    /// Istanbul
    Istanbul,
    /// Berlin
    Berlin,
    /// London
    London,
    /// Shanghai
    Shanghai,
    /// Cancun
    #[default]
    Cancun,
}
