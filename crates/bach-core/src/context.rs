//! Transactional execution state
//!
//! [`ExecutionContext`] borrows the ledger for one transaction. Every write
//! goes straight to the ledger and leaves an undo record on the journal,
//! so a checkpoint can be rolled back precisely and a commit only has to drop
//! the records.

use bach_primitives::{Address, H256, U256};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::account::{Account, ContractType, EMPTY_CODE_HASH};
use crate::config::Env;
use crate::error::{ExecError, ExecResult};
use crate::event::Event;
use crate::ledger::Ledger;
use crate::native::NativeContract;
use crate::transactional::{Checkpoint, Journal, Revert};

/// A contract deployed during the transaction
#[derive(Clone)]
pub struct NewContract {
    /// Contract address
    pub address: Address,
    /// Execution model
    pub contract_type: ContractType,
    /// Native instance, `None` for bytecode contracts
    pub instance: Option<Arc<dyn NativeContract>>,
}

impl fmt::Debug for NewContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewContract")
            .field("address", &self.address)
            .field("contract_type", &self.contract_type)
            .field("instance", &self.instance.as_ref().map(|c| c.type_name()))
            .finish()
    }
}

/// What a committed transaction hands to persistence
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Events in emission order
    pub events: Vec<Event>,
    /// Contracts deployed by the transaction
    pub new_contracts: Vec<NewContract>,
    /// Accounts whose fields changed, sorted
    pub touched_accounts: Vec<Address>,
    /// Final value of every written storage slot, sorted by key
    pub storage_writes: Vec<(Address, H256, H256)>,
}

/// Mutable state the journal reverts against
pub(crate) struct State<'a> {
    ledger: &'a mut Ledger,
    events: Vec<Event>,
    new_contracts: Vec<NewContract>,
    transient: HashMap<(Address, H256), H256>,
    // slot values before the transaction's first write
    originals: HashMap<(Address, H256), H256>,
}

/// Undo action for one context write
pub(crate) enum Undo {
    AccountCreated(Address),
    Balance {
        address: Address,
        previous: U256,
    },
    Nonce {
        address: Address,
        previous: u64,
    },
    Code {
        address: Address,
        code: Bytes,
        code_hash: H256,
    },
    ContractType {
        address: Address,
        previous: ContractType,
    },
    Storage {
        address: Address,
        key: H256,
        previous: Option<H256>,
    },
    Transient {
        address: Address,
        key: H256,
        previous: Option<H256>,
    },
    Contract {
        address: Address,
        previous: Option<Arc<dyn NativeContract>>,
    },
    Event,
    NewContract,
}

impl Undo {
    fn touched_account(&self) -> Option<Address> {
        match self {
            Undo::AccountCreated(address)
            | Undo::Balance { address, .. }
            | Undo::Nonce { address, .. }
            | Undo::Code { address, .. }
            | Undo::ContractType { address, .. }
            | Undo::Contract { address, .. } => Some(*address),
            _ => None,
        }
    }
}

impl<'a> Revert<State<'a>> for Undo {
    fn revert(self, state: &mut State<'a>) {
        match self {
            Undo::AccountCreated(address) => {
                state.ledger.remove_account(&address);
            }
            Undo::Balance { address, previous } => {
                if let Some(account) = state.ledger.account_mut(&address) {
                    account.balance = previous;
                }
            }
            Undo::Nonce { address, previous } => {
                if let Some(account) = state.ledger.account_mut(&address) {
                    account.nonce = previous;
                }
            }
            Undo::Code {
                address,
                code,
                code_hash,
            } => {
                if let Some(account) = state.ledger.account_mut(&address) {
                    account.code = code;
                    account.code_hash = code_hash;
                }
            }
            Undo::ContractType { address, previous } => {
                if let Some(account) = state.ledger.account_mut(&address) {
                    account.contract_type = previous;
                }
            }
            Undo::Storage {
                address,
                key,
                previous,
            } => state.ledger.restore_storage(address, key, previous),
            Undo::Transient {
                address,
                key,
                previous,
            } => match previous {
                Some(value) => {
                    state.transient.insert((address, key), value);
                }
                None => {
                    state.transient.remove(&(address, key));
                }
            },
            Undo::Contract { address, previous } => match previous {
                Some(contract) => {
                    state.ledger.insert_contract(address, contract);
                }
                None => {
                    state.ledger.remove_contract(&address);
                }
            },
            Undo::Event => {
                state.events.pop();
            }
            Undo::NewContract => {
                state.new_contracts.pop();
            }
        }
    }
}

/// Journaled view of one account.
///
/// Each setter records the previous value before writing.
pub struct AccountMut<'c> {
    address: Address,
    account: &'c mut Account,
    journal: &'c mut Journal<Undo>,
}

impl AccountMut<'_> {
    /// Account address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current balance
    pub fn balance(&self) -> U256 {
        self.account.balance
    }

    /// Current nonce
    pub fn nonce(&self) -> u64 {
        self.account.nonce
    }

    /// Current execution model
    pub fn contract_type(&self) -> ContractType {
        self.account.contract_type
    }

    /// Set balance
    pub fn set_balance(&mut self, balance: U256) {
        self.journal.record(Undo::Balance {
            address: self.address,
            previous: self.account.balance,
        });
        self.account.balance = balance;
    }

    /// Set nonce
    pub fn set_nonce(&mut self, nonce: u64) {
        self.journal.record(Undo::Nonce {
            address: self.address,
            previous: self.account.nonce,
        });
        self.account.nonce = nonce;
    }

    /// Increment nonce, returning the value before the increment
    pub fn increment_nonce(&mut self) -> u64 {
        let previous = self.account.nonce;
        self.set_nonce(previous.saturating_add(1));
        previous
    }

    /// Replace the runtime code and its hash
    pub fn set_code(&mut self, code: Bytes) {
        let code_hash = if code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            bach_crypto::keccak256(&code)
        };
        self.journal.record(Undo::Code {
            address: self.address,
            code: std::mem::replace(&mut self.account.code, code),
            code_hash: std::mem::replace(&mut self.account.code_hash, code_hash),
        });
    }

    /// Set execution model
    pub fn set_contract_type(&mut self, contract_type: ContractType) {
        self.journal.record(Undo::ContractType {
            address: self.address,
            previous: self.account.contract_type,
        });
        self.account.contract_type = contract_type;
    }
}

/// Per-transaction state over the ledger
pub struct ExecutionContext<'a> {
    state: State<'a>,
    journal: Journal<Undo>,
    env: Env,
}

impl<'a> ExecutionContext<'a> {
    /// Context for one transaction
    pub fn new(ledger: &'a mut Ledger, env: Env) -> Self {
        Self {
            state: State {
                ledger,
                events: Vec::new(),
                new_contracts: Vec::new(),
                transient: HashMap::new(),
                originals: HashMap::new(),
            },
            journal: Journal::new(),
            env,
        }
    }

    /// Read-only ledger view
    pub fn ledger(&self) -> &Ledger {
        self.state.ledger
    }

    // ==================== Accounts ====================

    /// Get account
    pub fn account(&self, address: &Address) -> ExecResult<&Account> {
        self.state
            .ledger
            .account(address)
            .ok_or(ExecError::AccountNotFound(*address))
    }

    /// Get account for journaled update
    pub fn account_mut(&mut self, address: &Address) -> ExecResult<AccountMut<'_>> {
        let account = self
            .state
            .ledger
            .account_mut(address)
            .ok_or(ExecError::AccountNotFound(*address))?;
        Ok(AccountMut {
            address: *address,
            account,
            journal: &mut self.journal,
        })
    }

    /// Check if account exists
    pub fn account_exists(&self, address: &Address) -> bool {
        self.state.ledger.account(address).is_some()
    }

    /// Balance, zero for unknown accounts
    pub fn balance(&self, address: &Address) -> U256 {
        self.state
            .ledger
            .account(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Nonce, zero for unknown accounts
    pub fn nonce(&self, address: &Address) -> u64 {
        self.state.ledger.account(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Execution model, `NotAContract` for unknown accounts
    pub fn contract_type(&self, address: &Address) -> ContractType {
        self.state
            .ledger
            .account(address)
            .map(|a| a.contract_type)
            .unwrap_or_default()
    }

    /// Create an empty account if none exists, returning whether it was created
    pub fn create_account(&mut self, address: &Address) -> bool {
        if self.account_exists(address) {
            return false;
        }
        self.state.ledger.insert_account(*address, Account::new());
        self.journal.record(Undo::AccountCreated(*address));
        true
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// Fails without touching either account when `from` cannot cover the
    /// amount. A missing recipient is created first.
    pub fn transfer_balance(&mut self, from: &Address, to: &Address, amount: U256) -> ExecResult<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(ExecError::InsufficientBalance {
                address: *from,
                required: amount,
                available,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }

        self.account_mut(from)?.set_balance(available - amount);
        self.create_account(to);
        let mut recipient = self.account_mut(to)?;
        let credited = recipient.balance().saturating_add(amount);
        recipient.set_balance(credited);
        Ok(())
    }

    // ==================== Storage ====================

    /// Write a storage slot
    pub fn store(&mut self, address: &Address, key: H256, value: H256) {
        let previous = self.state.ledger.set_storage(*address, key, value);
        self.state
            .originals
            .entry((*address, key))
            .or_insert_with(|| previous.unwrap_or_default());
        self.journal.record(Undo::Storage {
            address: *address,
            key,
            previous,
        });
    }

    /// Read a storage slot, zero when unset
    pub fn retrieve(&self, address: &Address, key: &H256) -> H256 {
        self.state.ledger.storage(address, key)
    }

    /// Value of a storage slot before this transaction first wrote it
    pub fn original_storage(&self, address: &Address, key: &H256) -> H256 {
        self.state
            .originals
            .get(&(*address, *key))
            .copied()
            .unwrap_or_else(|| self.retrieve(address, key))
    }

    /// Write a transient slot (cleared when the transaction ends)
    pub fn store_transient(&mut self, address: &Address, key: H256, value: H256) {
        let previous = self.state.transient.insert((*address, key), value);
        self.journal.record(Undo::Transient {
            address: *address,
            key,
            previous,
        });
    }

    /// Read a transient slot, zero when unset
    pub fn retrieve_transient(&self, address: &Address, key: &H256) -> H256 {
        self.state
            .transient
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    // ==================== Events ====================

    /// Buffer an event, stamping its log index and block/tx fields
    pub fn add_event(&mut self, mut event: Event) {
        event.log_index = self.state.events.len() as u64;
        event.tx_hash = self.env.tx.hash;
        event.tx_index = self.env.tx.index;
        event.block_hash = self.env.block.hash;
        event.block_number = self.env.block.number;
        self.state.events.push(event);
        self.journal.record(Undo::Event);
    }

    /// Events buffered so far
    pub fn events(&self) -> &[Event] {
        &self.state.events
    }

    // ==================== Contracts ====================

    /// Register a native contract deployed by this transaction
    pub fn add_contract(
        &mut self,
        address: &Address,
        contract: Arc<dyn NativeContract>,
    ) -> ExecResult<()> {
        if self.state.ledger.contract(address).is_some() || self.contract_type(address).is_contract() {
            return Err(ExecError::ContractAlreadyExists(*address));
        }

        self.create_account(address);
        {
            let mut account = self.account_mut(address)?;
            account.set_nonce(1);
            account.set_contract_type(ContractType::Native);
        }

        let previous = self.state.ledger.insert_contract(*address, contract.clone());
        self.journal.record(Undo::Contract {
            address: *address,
            previous,
        });
        self.notify_new_contract(address, ContractType::Native, Some(contract));
        Ok(())
    }

    /// Record a deployment for the host to finalize
    pub fn notify_new_contract(
        &mut self,
        address: &Address,
        contract_type: ContractType,
        instance: Option<Arc<dyn NativeContract>>,
    ) {
        self.state.new_contracts.push(NewContract {
            address: *address,
            contract_type,
            instance,
        });
        self.journal.record(Undo::NewContract);
    }

    /// Contracts deployed so far
    pub fn new_contracts(&self) -> &[NewContract] {
        &self.state.new_contracts
    }

    /// Native instance at `address`
    pub fn contract(&self, address: &Address) -> ExecResult<Arc<dyn NativeContract>> {
        self.state
            .ledger
            .contract(address)
            .ok_or(ExecError::ContractNotFound(*address))
    }

    // ==================== Checkpoints ====================

    /// Mark the current journal depth
    pub fn checkpoint(&self) -> Checkpoint {
        self.journal.checkpoint()
    }

    /// Undo every write made after `checkpoint`
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        self.journal.revert_to(checkpoint, &mut self.state);
    }

    /// Keep the writes made after `checkpoint`.
    ///
    /// The records stay on the journal so an enclosing checkpoint can still
    /// undo them.
    pub fn commit_checkpoint(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.depth() <= self.journal.len());
    }

    /// Number of pending undo records
    pub fn pending_changes(&self) -> usize {
        self.journal.len()
    }

    /// Keep every write and hand back what persistence needs
    pub fn commit(&mut self) -> CommitReport {
        let mut touched = BTreeSet::new();
        let mut slots = BTreeSet::new();
        for action in self.journal.records() {
            if let Some(address) = action.touched_account() {
                touched.insert(address);
            }
            if let Undo::Storage { address, key, .. } = action {
                slots.insert((*address, *key));
            }
        }

        let storage_writes: BTreeMap<_, _> = slots
            .into_iter()
            .map(|(address, key)| ((address, key), self.retrieve(&address, &key)))
            .collect();

        self.journal.commit_all();
        self.state.transient.clear();
        self.state.originals.clear();

        CommitReport {
            events: std::mem::take(&mut self.state.events),
            new_contracts: std::mem::take(&mut self.state.new_contracts),
            touched_accounts: touched.into_iter().collect(),
            storage_writes: storage_writes
                .into_iter()
                .map(|((address, key), value)| (address, key, value))
                .collect(),
        }
    }

    /// Undo every pending write
    pub fn revert(&mut self) {
        self.journal.revert_all(&mut self.state);
        self.state.transient.clear();
        self.state.originals.clear();
        self.state.events.clear();
        self.state.new_contracts.clear();
    }

    // ==================== Environment ====================

    /// Block and transaction environment
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Block gas limit
    pub fn block_gas_limit(&self) -> u64 {
        self.env.block_gas_limit
    }

    /// Block number
    pub fn block_number(&self) -> u64 {
        self.env.block.number
    }

    /// Block timestamp
    pub fn block_timestamp(&self) -> u64 {
        self.env.block.timestamp
    }

    /// Block producer
    pub fn block_coinbase(&self) -> Address {
        self.env.block.coinbase
    }

    /// Hash of block `number`, zero when unknown
    pub fn block_hash(&self, number: u64) -> H256 {
        self.env.block.block_hash(number)
    }

    /// Transaction hash
    pub fn tx_hash(&self) -> H256 {
        self.env.tx.hash
    }

    /// Transaction index in the block
    pub fn tx_index(&self) -> u64 {
        self.env.tx.index
    }

    /// Transaction signer
    pub fn tx_origin(&self) -> Address {
        self.env.tx.origin
    }

    /// Gas price
    pub fn tx_gas_price(&self) -> u64 {
        self.env.tx.gas_price
    }

    /// Chain ID
    pub fn chain_id(&self) -> u64 {
        self.env.chain_id
    }
}
