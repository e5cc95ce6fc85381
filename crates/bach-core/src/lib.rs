//! # bach-core
//!
//! Smart-contract execution core for BachLedger.
//!
//! One [`ContractHost`] is built per transaction. It dispatches messages to
//! three execution models behind a common checkpoint discipline:
//! - Native contracts compiled into the node ([`native`])
//! - Bytecode contracts on an external VM ([`bytecode`])
//! - Precompiled contracts ([`precompiles`])
//!
//! Every write lands in the [`Ledger`] through the [`ExecutionContext`],
//! which keeps an undo journal ([`transactional`]) so any frame can be
//! rolled back and a failed transaction leaves the ledger untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut ledger = Ledger::from_genesis(&alloc)?;
//! let mut host = ContractHost::new(&mut ledger, env, vm, &config);
//! let mut gas = Gas::new(1_000_000);
//! host.execute(Message::call(sender, token, U256::zero(), input, &mut gas))?;
//! let receipt = host.finish();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod address;
pub mod bytecode;
pub mod config;
pub mod context;
pub mod costs;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod executor;
pub mod gas;
pub mod host;
pub mod ledger;
pub mod message;
pub mod native;
pub mod precompiles;
pub mod tracer;
pub mod transactional;

pub use account::{Account, ContractType, EMPTY_CODE_HASH};
pub use address::{create2_address, create_address};
pub use bytecode::BytecodeExecutor;
pub use config::{BlockEnv, ConfigError, ConfigResult, Env, ExecutionConfig, GenesisAccount, GenesisAlloc, TxEnv};
pub use context::{AccountMut, CommitReport, ExecutionContext, NewContract};
pub use dispatcher::Dispatcher;
pub use error::{ExecError, ExecResult};
pub use event::Event;
pub use executor::ContractExecutor;
pub use gas::Gas;
pub use host::{ContractHost, TxReceipt};
pub use ledger::{Ledger, SharedLedger};
pub use message::{CallInput, CallMessage, CallScheme, CreateInput, CreateMessage, Message, Output};
pub use native::{
    CallOutcome, ContractManager, ContractRegistry, Method, Mutability, NativeCall, NativeContract,
    NativeExecutor, CONTRACT_MANAGER_ADDRESS,
};
pub use precompiles::{PrecompiledExecutor, RANDOM_ADDRESS};
pub use tracer::{Call, CallStatus, CallTracer, CallType, TracerError};
