//! Transaction and block environment visible to bytecode

use bach_primitives::{Address, H256, U256};

/// Transaction and block environment, as returned by `Host::get_tx_context`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxContext {
    /// Transaction gas price
    pub gas_price: U256,
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Block coinbase (validator)
    pub coinbase: Address,
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block prevrandao
    pub prevrandao: H256,
    /// Chain ID
    pub chain_id: u64,
    /// Base fee (EIP-1559)
    pub base_fee: U256,
}

impl Default for TxContext {
    fn default() -> Self {
        Self {
            gas_price: U256::zero(),
            origin: Address::ZERO,
            coinbase: Address::ZERO,
            number: 0,
            timestamp: 0,
            gas_limit: 30_000_000,
            prevrandao: H256::ZERO,
            chain_id: 1,
            base_fee: U256::zero(),
        }
    }
}
