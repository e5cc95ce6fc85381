//! Contract events

use bach_primitives::{Address, H256};
use bytes::Bytes;

/// Event emitted during message execution.
///
/// Contracts fill in `name`, `address`, `data`, `topics` and `anonymous`;
/// the execution context stamps the log index and the block and transaction
/// fields when the event is buffered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    /// Event name, empty for bytecode logs
    pub name: String,
    /// Position in the transaction's event buffer
    pub log_index: u64,
    /// Hash of the emitting transaction
    pub tx_hash: H256,
    /// Index of the emitting transaction in its block
    pub tx_index: u64,
    /// Block hash
    pub block_hash: H256,
    /// Block number
    pub block_number: u64,
    /// Emitting contract
    pub address: Address,
    /// Non-indexed payload
    pub data: Bytes,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Whether the signature topic is omitted
    pub anonymous: bool,
}

impl Event {
    /// Create a new named event
    pub fn new(name: impl Into<String>, address: Address, topics: Vec<H256>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            address,
            topics,
            data,
            ..Self::default()
        }
    }

    /// Event from a bytecode `LOG` instruction
    pub fn log(address: Address, topics: Vec<H256>, data: Bytes) -> Self {
        Self::new(String::new(), address, topics, data)
    }

    /// Get the first topic (usually the event signature)
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }
}
