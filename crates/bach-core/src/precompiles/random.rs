//! Deterministic randomness source

use bach_primitives::{H256, U256};

/// Hash-chain generator: each draw replaces the seed with its keccak256
/// and returns the new seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomGen {
    seed: H256,
}

impl RandomGen {
    /// Generator starting from `seed`
    pub fn new(seed: H256) -> Self {
        Self { seed }
    }

    /// Current seed
    pub fn seed(&self) -> H256 {
        self.seed
    }

    /// Advance and return the next word
    pub fn next_word(&mut self) -> H256 {
        self.seed = bach_crypto::keccak256(self.seed.as_bytes());
        self.seed
    }

    /// Advance and return the next value as an integer
    pub fn next_u256(&mut self) -> U256 {
        self.next_word().to_u256()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomGen::new(H256::from_low_u64_be(42));
        let mut b = RandomGen::new(H256::from_low_u64_be(42));
        for _ in 0..4 {
            assert_eq!(a.next_word(), b.next_word());
        }
    }

    #[test]
    fn test_draw_updates_seed() {
        let mut rng = RandomGen::new(H256::ZERO);
        let value = rng.next_u256();
        assert_eq!(H256::from(value), rng.seed());
        assert_ne!(rng.next_word(), H256::from(value));
    }
}
