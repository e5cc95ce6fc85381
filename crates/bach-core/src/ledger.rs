//! In-memory ledger state

use bach_primitives::{Address, H256};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::account::{Account, ContractType};
use crate::config::{ConfigError, ConfigResult, GenesisAlloc};
use crate::native::{ContractManager, ContractRegistry, NativeContract, CONTRACT_MANAGER_ADDRESS};

/// Ledger shared between block application and read-only queries
pub type SharedLedger = Arc<RwLock<Ledger>>;

/// Committed accounts, storage and native contract instances.
///
/// The execution context mutates the ledger directly and keeps undo records
/// for every write, so after a transaction commits the maps already hold the
/// new values.
#[derive(Default)]
pub struct Ledger {
    accounts: HashMap<Address, Account>,
    storage: HashMap<(Address, H256), H256>,
    contracts: HashMap<Address, Arc<dyn NativeContract>>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from a genesis allocation
    pub fn from_genesis(alloc: &GenesisAlloc) -> ConfigResult<Self> {
        let mut ledger = Self::new();
        for (key, genesis) in alloc {
            let address =
                Address::from_hex(key).map_err(|_| ConfigError::InvalidAddress(key.clone()))?;
            let mut account = Account::with_balance(genesis.parse_balance(key)?);
            account.nonce = genesis.nonce;
            if let Some(code) = genesis.parse_code(key)? {
                account.code_hash = bach_crypto::keccak256(&code);
                account.code = code;
                account.contract_type = ContractType::Bytecode;
            }
            for (slot, value) in genesis.parse_storage(key)? {
                ledger.set_storage(address, slot, value);
            }
            ledger.insert_account(address, account);
        }
        Ok(ledger)
    }

    /// Wrap the ledger for shared access
    pub fn into_shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    /// Get account
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Get account for update
    pub fn account_mut(&mut self, address: &Address) -> Option<&mut Account> {
        self.accounts.get_mut(address)
    }

    /// Insert or replace an account, returning the previous one
    pub fn insert_account(&mut self, address: Address, account: Account) -> Option<Account> {
        self.accounts.insert(address, account)
    }

    /// Remove an account
    pub fn remove_account(&mut self, address: &Address) -> Option<Account> {
        self.accounts.remove(address)
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Get storage slot, zero when absent
    pub fn storage(&self, address: &Address, key: &H256) -> H256 {
        self.storage.get(&(*address, *key)).copied().unwrap_or_default()
    }

    /// Write a storage slot, returning the previous entry
    pub fn set_storage(&mut self, address: Address, key: H256, value: H256) -> Option<H256> {
        self.storage.insert((address, key), value)
    }

    /// Restore a storage slot to a previous entry
    pub fn restore_storage(&mut self, address: Address, key: H256, previous: Option<H256>) {
        match previous {
            Some(value) => {
                self.storage.insert((address, key), value);
            }
            None => {
                self.storage.remove(&(address, key));
            }
        }
    }

    /// Native instance at `address`
    pub fn contract(&self, address: &Address) -> Option<Arc<dyn NativeContract>> {
        self.contracts.get(address).cloned()
    }

    /// Register a native instance, returning the one it replaces
    pub fn insert_contract(
        &mut self,
        address: Address,
        contract: Arc<dyn NativeContract>,
    ) -> Option<Arc<dyn NativeContract>> {
        self.contracts.insert(address, contract)
    }

    /// Unregister a native instance
    pub fn remove_contract(&mut self, address: &Address) -> Option<Arc<dyn NativeContract>> {
        self.contracts.remove(address)
    }

    /// Install a native contract outside of any transaction (genesis, system
    /// contracts)
    pub fn register_native(&mut self, address: Address, contract: Arc<dyn NativeContract>) {
        let account = self.accounts.entry(address).or_default();
        account.contract_type = ContractType::Native;
        account.nonce = account.nonce.max(1);
        self.contracts.insert(address, contract);
    }

    /// Install the contract manager able to deploy the types in `registry`
    pub fn install_contract_manager(&mut self, registry: ContractRegistry) {
        self.register_native(CONTRACT_MANAGER_ADDRESS, Arc::new(ContractManager::new(registry)));
    }

    /// Addresses with a registered native instance, sorted
    pub fn native_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<_> = self.contracts.keys().copied().collect();
        addresses.sort();
        addresses
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("accounts", &self.accounts.len())
            .field("storage", &self.storage.len())
            .field("contracts", &self.native_addresses())
            .finish()
    }
}
