use serde::{Serialize, Deserialize};
use sha2::{Digest, Sha256};

/// Block height assigned by the engine, monotonically increasing.
pub type BlockIndex = u64;

/// A finalized batch of transactions produced by the consensus engine.
///
/// The proxy treats it as an immutable record; transactions are opaque byte
/// sequences that are carried through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: BlockIndex,
    pub round_received: u64,
    pub transactions: Vec<Vec<u8>>,
}

impl Block {
    pub fn new(index: BlockIndex, round_received: u64, transactions: Vec<Vec<u8>>) -> Self {
        Self { index, round_received, transactions }
    }
}

/// Reply value of a `State.CommitBlock` call on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateHash {
    pub hash: Vec<u8>,
}

/// utility: hash bytes to a Vec<u8>
pub fn hash_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().to_vec()
}
