//! Execution configuration and block/transaction environment

use bach_evm::TxContext;
use bach_primitives::{Address, H256, U256};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Block gas limit must be positive
    #[error("block gas limit must be greater than zero")]
    ZeroBlockGasLimit,

    /// Call depth limit must be positive
    #[error("max call depth must be greater than zero")]
    ZeroCallDepth,

    /// JSON parse failure
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    /// Genesis address could not be parsed
    #[error("invalid genesis address {0}")]
    InvalidAddress(String),

    /// Genesis balance could not be parsed
    #[error("invalid balance {value} for {address}")]
    InvalidBalance {
        /// Account key as written
        address: String,
        /// Balance as written
        value: String,
    },

    /// Genesis code is not valid hex
    #[error("invalid code for {0}")]
    InvalidCode(String),

    /// Genesis storage entry is not a pair of 32-byte words
    #[error("invalid storage entry {key} for {address}")]
    InvalidStorage {
        /// Account key as written
        address: String,
        /// Slot as written
        key: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Execution core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Chain ID
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Block gas limit
    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,
    /// Initial seed of the randomness precompile
    #[serde(default)]
    pub randomness_seed: H256,
    /// Maximum call nesting
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Record call traces
    #[serde(default)]
    pub tracing: bool,
}

fn default_chain_id() -> u64 {
    1337
}

fn default_block_gas_limit() -> u64 {
    30_000_000
}

fn default_max_call_depth() -> usize {
    1024
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            block_gas_limit: default_block_gas_limit(),
            randomness_seed: H256::ZERO,
            max_call_depth: default_max_call_depth(),
            tracing: false,
        }
    }
}

impl ExecutionConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable call tracing
    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    /// Reject limits that would make every message fail
    pub fn validate(&self) -> ConfigResult<()> {
        if self.block_gas_limit == 0 {
            return Err(ConfigError::ZeroBlockGasLimit);
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        Ok(())
    }
}

/// Block-level environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockEnv {
    /// Block number
    #[serde(default)]
    pub number: u64,
    /// Block timestamp
    #[serde(default)]
    pub timestamp: u64,
    /// Block producer
    #[serde(default)]
    pub coinbase: Address,
    /// Hash of the block being applied
    #[serde(default)]
    pub hash: H256,
    /// Hashes of recent ancestors by number
    #[serde(default)]
    pub ancestors: HashMap<u64, H256>,
}

impl BlockEnv {
    /// Hash of block `number`, zero when unknown
    pub fn block_hash(&self, number: u64) -> H256 {
        if number == self.number {
            return self.hash;
        }
        self.ancestors.get(&number).copied().unwrap_or_default()
    }
}

/// Transaction-level environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxEnv {
    /// Transaction hash
    #[serde(default)]
    pub hash: H256,
    /// Index in the block
    #[serde(default)]
    pub index: u64,
    /// Signer of the transaction
    #[serde(default)]
    pub origin: Address,
    /// Gas price
    #[serde(default)]
    pub gas_price: u64,
}

/// Everything a message can observe about its surroundings
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// Chain ID
    pub chain_id: u64,
    /// Block gas limit
    pub block_gas_limit: u64,
    /// Current block
    pub block: BlockEnv,
    /// Current transaction
    pub tx: TxEnv,
}

impl Env {
    /// Environment for one transaction
    pub fn new(config: &ExecutionConfig, block: BlockEnv, tx: TxEnv) -> Self {
        Self {
            chain_id: config.chain_id,
            block_gas_limit: config.block_gas_limit,
            block,
            tx,
        }
    }

    /// VM view of the environment
    pub fn tx_context(&self) -> TxContext {
        TxContext {
            gas_price: U256::from(self.tx.gas_price),
            origin: self.tx.origin,
            coinbase: self.block.coinbase,
            number: self.block.number,
            timestamp: self.block.timestamp,
            gas_limit: self.block_gas_limit,
            prevrandao: H256::ZERO,
            chain_id: self.chain_id,
            base_fee: U256::zero(),
        }
    }
}

/// Genesis account allocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Account balance (hex with 0x prefix, or decimal)
    #[serde(default)]
    pub balance: String,
    /// Account nonce
    #[serde(default)]
    pub nonce: u64,
    /// Bytecode (hex string)
    #[serde(default)]
    pub code: Option<String>,
    /// Storage (slot -> value mapping)
    #[serde(default)]
    pub storage: HashMap<String, String>,
}

impl GenesisAccount {
    /// Parse balance from hex or decimal string
    pub fn parse_balance(&self, address: &str) -> ConfigResult<U256> {
        let s = self.balance.trim();
        let invalid = || ConfigError::InvalidBalance {
            address: address.to_string(),
            value: self.balance.clone(),
        };
        if s.is_empty() {
            return Ok(U256::zero());
        }
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => U256::from_str_radix(digits, 16).map_err(|_| invalid()),
            None => U256::from_dec_str(s).map_err(|_| invalid()),
        }
    }

    /// Parse code from hex string
    pub fn parse_code(&self, address: &str) -> ConfigResult<Option<Bytes>> {
        let Some(code) = &self.code else {
            return Ok(None);
        };
        let code = code.trim();
        let code = code.strip_prefix("0x").unwrap_or(code);
        let bytes = hex::decode(code).map_err(|_| ConfigError::InvalidCode(address.to_string()))?;
        Ok((!bytes.is_empty()).then(|| Bytes::from(bytes)))
    }

    /// Parse storage entries
    pub fn parse_storage(&self, address: &str) -> ConfigResult<HashMap<H256, H256>> {
        let mut result = HashMap::new();
        for (key, value) in &self.storage {
            let invalid = || ConfigError::InvalidStorage {
                address: address.to_string(),
                key: key.clone(),
            };
            let k = H256::from_hex(key.trim()).map_err(|_| invalid())?;
            let v = H256::from_hex(value.trim()).map_err(|_| invalid())?;
            result.insert(k, v);
        }
        Ok(result)
    }
}

/// Initial ledger contents keyed by hex address
pub type GenesisAlloc = HashMap<String, GenesisAccount>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ExecutionConfig ====================

    #[test]
    fn test_default_config() {
        let config = ExecutionConfig::default();
        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.block_gas_limit, 30_000_000);
        assert_eq!(config.max_call_depth, 1024);
        assert!(!config.tracing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = ExecutionConfig::from_json(r#"{"chain_id": 7, "tracing": true}"#).unwrap();
        assert_eq!(config.chain_id, 7);
        assert!(config.tracing);
        assert_eq!(config.max_call_depth, 1024);
        assert!(config.randomness_seed.is_zero());
    }

    #[test]
    fn test_config_rejects_zero_limits() {
        assert!(matches!(
            ExecutionConfig::from_json(r#"{"block_gas_limit": 0}"#),
            Err(ConfigError::ZeroBlockGasLimit)
        ));
        assert!(matches!(
            ExecutionConfig::from_json(r#"{"max_call_depth": 0}"#),
            Err(ConfigError::ZeroCallDepth)
        ));
        assert!(matches!(
            ExecutionConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_config_seed_from_hex() {
        let json = r#"{"randomness_seed": "0x0000000000000000000000000000000000000000000000000000000000000007"}"#;
        let config = ExecutionConfig::from_json(json).unwrap();
        assert_eq!(config.randomness_seed, H256::from_low_u64_be(7));
    }

    // ==================== Env ====================

    #[test]
    fn test_block_hash_lookup() {
        let mut block = BlockEnv {
            number: 10,
            hash: H256::from_low_u64_be(10),
            ..Default::default()
        };
        block.ancestors.insert(9, H256::from_low_u64_be(9));

        assert_eq!(block.block_hash(10), H256::from_low_u64_be(10));
        assert_eq!(block.block_hash(9), H256::from_low_u64_be(9));
        assert!(block.block_hash(3).is_zero());
    }

    #[test]
    fn test_tx_context() {
        let config = ExecutionConfig::default();
        let tx = TxEnv {
            origin: Address::from_bytes([0x11; 20]),
            gas_price: 3,
            ..Default::default()
        };
        let env = Env::new(&config, BlockEnv::default(), tx);
        let ctx = env.tx_context();
        assert_eq!(ctx.chain_id, 1337);
        assert_eq!(ctx.origin, Address::from_bytes([0x11; 20]));
        assert_eq!(ctx.gas_price, U256::from(3u64));
        assert_eq!(ctx.gas_limit, 30_000_000);
    }

    // ==================== Genesis ====================

    #[test]
    fn test_genesis_parse_balance() {
        let hex = GenesisAccount {
            balance: "0x3e8".to_string(),
            ..Default::default()
        };
        assert_eq!(hex.parse_balance("a").unwrap(), U256::from(1000u64));

        let dec = GenesisAccount {
            balance: "1000".to_string(),
            ..Default::default()
        };
        assert_eq!(dec.parse_balance("a").unwrap(), U256::from(1000u64));

        let empty = GenesisAccount::default();
        assert!(empty.parse_balance("a").unwrap().is_zero());

        let bad = GenesisAccount {
            balance: "lots".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad.parse_balance("a"), Err(ConfigError::InvalidBalance { .. })));
    }

    #[test]
    fn test_genesis_parse_code_and_storage() {
        let mut account = GenesisAccount {
            code: Some("0x6000".to_string()),
            ..Default::default()
        };
        account.storage.insert(
            format!("0x{}", "00".repeat(31) + "01"),
            format!("0x{}", "00".repeat(31) + "2a"),
        );

        assert_eq!(account.parse_code("a").unwrap(), Some(Bytes::from_static(&[0x60, 0x00])));
        let storage = account.parse_storage("a").unwrap();
        assert_eq!(storage.get(&H256::from_low_u64_be(1)), Some(&H256::from_low_u64_be(42)));
    }
}
