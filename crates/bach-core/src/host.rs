//! Per-transaction contract host

use bach_evm::Vm;
use std::sync::Arc;

use crate::config::{Env, ExecutionConfig};
use crate::context::{CommitReport, ExecutionContext};
use crate::costs::CONTRACT_EXECUTION_COST;
use crate::dispatcher::Dispatcher;
use crate::error::{ExecError, ExecResult};
use crate::ledger::Ledger;
use crate::message::{Message, Output};
use crate::tracer::Call;

/// Outcome of a finished transaction
#[derive(Debug)]
pub struct TxReceipt {
    /// Whether the state changes were kept
    pub success: bool,
    /// Error that reverted the transaction
    pub error: Option<ExecError>,
    /// Committed changes, empty when reverted
    pub report: CommitReport,
    /// Call tree, when tracing is enabled
    pub trace: Option<Call>,
}

/// Runs the messages of one transaction against the ledger.
///
/// Built once per transaction by block application while it holds the
/// ledger's write lock. Any failed message marks the host for revert, and
/// [`finish`](Self::finish) then undoes every write of the transaction. A
/// host dropped before `finish` reverts as well.
pub struct ContractHost<'a> {
    dispatcher: Dispatcher<'a>,
    must_revert: bool,
    error: Option<ExecError>,
    finished: bool,
}

impl<'a> ContractHost<'a> {
    /// Host for one transaction
    pub fn new(ledger: &'a mut Ledger, env: Env, vm: Arc<dyn Vm>, config: &ExecutionConfig) -> Self {
        let context = ExecutionContext::new(ledger, env);
        Self {
            dispatcher: Dispatcher::new(context, vm, config),
            must_revert: false,
            error: None,
            finished: false,
        }
    }

    /// Charge the base execution cost and dispatch `message`
    pub fn execute(&mut self, mut message: Message<'_>) -> ExecResult<Output> {
        let result = message
            .use_gas(CONTRACT_EXECUTION_COST)
            .and_then(|()| self.dispatcher.dispatch(message));

        if let Err(err) = &result {
            tracing::debug!("Transaction {} failed: {}", self.context().tx_hash(), err);
            self.must_revert = true;
            self.error.get_or_insert_with(|| err.clone());
        }
        result
    }

    /// Execute `message` and throw its changes away
    pub fn simulate(&mut self, mut message: Message<'_>) -> ExecResult<Output> {
        let checkpoint = self.dispatcher.context().checkpoint();
        let result = message
            .use_gas(CONTRACT_EXECUTION_COST)
            .and_then(|()| self.dispatcher.dispatch(message));
        self.dispatcher.context_mut().revert_to(checkpoint);
        result
    }

    /// Whether `finish` will revert
    pub fn must_revert(&self) -> bool {
        self.must_revert
    }

    /// Transaction state
    pub fn context(&self) -> &ExecutionContext<'a> {
        self.dispatcher.context()
    }

    /// Finished call tree, when tracing is enabled
    pub fn call_trace(&self) -> Option<&Call> {
        self.dispatcher.tracer().and_then(|tracer| tracer.root().ok())
    }

    /// Commit or revert the transaction
    pub fn finish(mut self) -> TxReceipt {
        let trace = self.call_trace().cloned();
        let tx_hash = self.context().tx_hash();
        self.finished = true;
        let error = self.error.take();
        let context = self.dispatcher.context_mut();

        if self.must_revert {
            context.revert();
            tracing::warn!(
                "Transaction {} reverted: {}",
                tx_hash,
                error.as_ref().map(ToString::to_string).unwrap_or_default()
            );
            return TxReceipt {
                success: false,
                error,
                report: CommitReport::default(),
                trace,
            };
        }

        let report = context.commit();
        tracing::info!(
            "Transaction {} committed: {} events, {} new contracts, {} accounts touched",
            tx_hash,
            report.events.len(),
            report.new_contracts.len(),
            report.touched_accounts.len()
        );
        TxReceipt {
            success: true,
            error: None,
            report,
            trace,
        }
    }
}

impl Drop for ContractHost<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Transaction {} dropped unfinished, reverting", self.context().tx_hash());
            self.dispatcher.context_mut().revert();
        }
    }
}
