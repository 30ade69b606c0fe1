//! Blocks, block headers and the header-only `BlockShort` projection.

use crate::codec::{self, CodecError, PayloadKind};
use crate::hash::{hash_concat, Hash};
use crate::merkle::{merkle_root, MerkleError, MerkleTree};
use crate::transaction::{current_timestamp, sort_by_timestamp, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or validating blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("merkle root mismatch: header has {expected}, transactions give {computed}")]
    MerkleRootMismatch { expected: Hash, computed: Hash },
    #[error("transaction {index} does not match its id")]
    TransactionIdMismatch { index: usize },
}

pub type Result<T> = std::result::Result<T, BlockError>;

/// Merkle leaves of a transaction list: each transaction's encoded bytes, in order.
fn transaction_leaves(transactions: &[Transaction]) -> Result<Vec<Vec<u8>>> {
    transactions
        .iter()
        .map(|tx| tx.serialize().map_err(BlockError::from))
        .collect()
}

/// Compute the merkle root committing to `transactions` in the given order.
pub fn transactions_root(transactions: &[Transaction]) -> Result<Hash> {
    Ok(merkle_root(&transaction_leaves(transactions)?)?)
}

/// The header of a block containing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (0 for genesis).
    pub height: u64,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    /// Hash of the previous block.
    pub prev_hash: Hash,
    /// Merkle root of transactions.
    pub merkle_root: Hash,
    /// Proof-of-work nonce, chosen by the consensus layer.
    pub nonce: u64,
}

impl BlockHeader {
    /// Calculate the hash of this block header.
    ///
    /// The preimage is the header's payload layout: fixed-width little-endian integers and
    /// raw 32-byte digests, in field order.
    pub fn hash(&self) -> Hash {
        hash_concat(&[
            &self.height.to_le_bytes(),
            &self.timestamp.to_le_bytes(),
            self.prev_hash.as_ref(),
            self.merkle_root.as_ref(),
            &self.nonce.to_le_bytes(),
        ])
    }
}

/// A complete block: header plus the ordered transactions it commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Create a block stamped with the current time.
    pub fn new(
        height: u64,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        nonce: u64,
    ) -> Result<Self> {
        Self::new_at(height, prev_hash, transactions, current_timestamp(), nonce)
    }

    /// Create a block with an explicit timestamp.
    pub fn new_at(
        height: u64,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        timestamp: i64,
        nonce: u64,
    ) -> Result<Self> {
        let merkle_root = transactions_root(&transactions)?;
        let block = Self {
            header: BlockHeader {
                height,
                timestamp,
                prev_hash,
                merkle_root,
                nonce,
            },
            transactions,
        };

        tracing::debug!(
            height,
            txs = block.transactions.len(),
            merkle_root = %merkle_root,
            "created block"
        );
        Ok(block)
    }

    /// Create a block after sorting `transactions` by timestamp.
    pub fn new_canonical(
        height: u64,
        prev_hash: Hash,
        mut transactions: Vec<Transaction>,
        nonce: u64,
    ) -> Result<Self> {
        sort_by_timestamp(&mut transactions);
        Self::new(height, prev_hash, transactions, nonce)
    }

    /// Create the genesis block around its coinbase transaction.
    pub fn genesis(coinbase: Transaction) -> Result<Self> {
        Self::new(0, Hash::ZERO, vec![coinbase], 0)
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Get the block hash (hash of the header).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn prev_hash(&self) -> Hash {
        self.header.prev_hash
    }

    pub fn merkle_root(&self) -> Hash {
        self.header.merkle_root
    }

    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.height == 0 && self.header.prev_hash == Hash::ZERO
    }

    /// Build the merkle tree over this block's transactions, for inclusion proofs.
    pub fn merkle_tree(&self) -> Result<MerkleTree> {
        Ok(MerkleTree::new(&transaction_leaves(&self.transactions)?)?)
    }

    /// Verify the merkle root matches the transactions.
    pub fn verify_merkle_root(&self) -> Result<bool> {
        Ok(transactions_root(&self.transactions)? == self.header.merkle_root)
    }

    /// Check every transaction id and the merkle root.
    pub fn validate(&self) -> Result<()> {
        for (index, tx) in self.transactions.iter().enumerate() {
            if !tx.verify_id()? {
                tracing::warn!(height = self.header.height, index, "transaction id mismatch");
                return Err(BlockError::TransactionIdMismatch { index });
            }
        }

        let computed = transactions_root(&self.transactions)?;
        if computed != self.header.merkle_root {
            tracing::warn!(
                height = self.header.height,
                expected = %self.header.merkle_root,
                %computed,
                "merkle root mismatch"
            );
            return Err(BlockError::MerkleRootMismatch {
                expected: self.header.merkle_root,
                computed,
            });
        }
        Ok(())
    }

    /// The header-only projection of this block.
    pub fn short(&self) -> BlockShort {
        BlockShort::from(self)
    }

    pub fn serialize(&self) -> std::result::Result<Vec<u8>, CodecError> {
        codec::encode(PayloadKind::Block, self)
    }

    /// Decode a block. The merkle root is not checked here; see [`Block::validate`].
    pub fn deserialize(bytes: &[u8]) -> std::result::Result<Self, CodecError> {
        let block: Self = codec::decode(PayloadKind::Block, bytes)?;
        for tx in &block.transactions {
            tx.check_shape()?;
        }
        Ok(block)
    }
}

/// Header fields of a block and its hash, without any transaction data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockShort {
    pub header: BlockHeader,
    pub hash: Hash,
}

impl BlockShort {
    pub fn new(header: BlockHeader) -> Self {
        let hash = header.hash();
        Self { header, hash }
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Check the stored hash against the header.
    pub fn verify_hash(&self) -> bool {
        self.header.hash() == self.hash
    }

    pub fn serialize(&self) -> std::result::Result<Vec<u8>, CodecError> {
        codec::encode(PayloadKind::BlockShort, self)
    }

    pub fn deserialize(bytes: &[u8]) -> std::result::Result<Self, CodecError> {
        codec::decode(PayloadKind::BlockShort, bytes)
    }
}

impl From<&Block> for BlockShort {
    fn from(block: &Block) -> Self {
        Self::new(block.header.clone())
    }
}
