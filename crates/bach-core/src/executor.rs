//! Executor seam between the dispatcher and the contract models

use bach_primitives::Address;

use crate::dispatcher::Dispatcher;
use crate::error::ExecResult;
use crate::message::{CallMessage, CallScheme, CreateMessage, Output};

/// Runs messages for one contract execution model.
///
/// The dispatcher checkpoints the context before either method runs and
/// rolls the frame back on `Err`. Call value is moved by the dispatcher;
/// creation value is moved by the executor once the address is known.
pub trait ContractExecutor {
    /// Run a call against the contract at `message.code_address`
    fn call(&self, dispatcher: &mut Dispatcher<'_>, scheme: CallScheme, message: CallMessage<'_>) -> ExecResult<Output>;

    /// Deploy a contract, returning its address
    fn create(&self, dispatcher: &mut Dispatcher<'_>, message: CreateMessage<'_>) -> ExecResult<Address>;
}
