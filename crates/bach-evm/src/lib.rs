//! # bach-evm
//!
//! Host-side interface to an external bytecode virtual machine.
//!
//! The VM itself is opaque and swappable. The execution core supplies a
//! [`Host`] implementation (state access, logs, nested calls) and reaches the
//! VM through the [`Vm`] trait:
//!
//! ```text
//! Vm::execute(host, revision, message, code) -> VmResult { status, gas_left, output }
//! ```
//!
//! The shapes mirror the EVMC host ABI: [`VmMessage`] is the call
//! descriptor, [`StatusCode`] the outcome, [`StorageStatus`] the result of a
//! storage write.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod context;
mod host;
mod message;
mod status;
mod vm;

pub use context::TxContext;
pub use host::{AccessStatus, Host};
pub use message::{CallKind, VmMessage};
pub use status::{Revision, StatusCode, StorageStatus};
pub use vm::{Vm, VmResult};
