//! Contract address derivation

use bach_crypto::keccak256;
use bach_primitives::{Address, H256};
use rlp::RlpStream;

/// CREATE address: keccak256(RLP([sender, nonce]))[12:]
///
/// Native contracts deployed through the contract manager use the same rule
/// with the deployer's nonce before the increment.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    if nonce == 0 {
        stream.append_empty_data();
    } else {
        stream.append(&nonce);
    }
    Address::from_word(&keccak256(&stream.out()))
}

/// CREATE2 address: keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12:]
pub fn create2_address(sender: &Address, salt: &H256, init_code: &[u8]) -> Address {
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(keccak256(init_code).as_bytes());
    Address::from_word(&keccak256(&preimage))
}
