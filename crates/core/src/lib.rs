//! Ledger primitives for sqlchain.
//!
//! This crate defines what two nodes must agree on byte for byte:
//! - SHA-256 digests and the merkle commitment over a block's transactions
//! - Transactions carrying value and an attached database command
//! - Blocks and their header-only `BlockShort` projection
//! - The versioned binary encoding of all of the above
//!
//! Everything here is immutable once built and free of I/O. Networking, consensus,
//! storage and command execution live elsewhere.
//!
//! # Example
//!
//! ```rust
//! use sqlchain_core::{Block, Transaction, TransactionInput, TransactionOutput};
//!
//! let miner = "0x20b4f541f7b1f1a66557cc6dffdfb8d05bfe9953";
//! let coinbase = Transaction::new_coinbase(miner, "").unwrap();
//!
//! let spend = Transaction::new(
//!     "INSERT INTO users (id, name) VALUES (1, 'alice')",
//!     vec![TransactionInput::new(coinbase.id(), 0)],
//!     vec![TransactionOutput::new(10, miner).unwrap()],
//! )
//! .unwrap();
//!
//! let block = Block::genesis(coinbase).unwrap();
//! let bytes = block.serialize().unwrap();
//! assert_eq!(Block::deserialize(&bytes).unwrap(), block);
//! assert!(block.validate().is_ok());
//! # let _ = spend;
//! ```

pub mod block;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{transactions_root, Block, BlockError, BlockHeader, BlockShort};
pub use codec::{CodecError, PayloadKind, ENCODING_VERSION};
pub use config::ChainParams;
pub use crypto::{hash_pub_key, Address, CryptoError, Keypair, PublicKey};
pub use hash::{hash, hash_concat, Hash, H256};
pub use merkle::{merkle_root, verify_proof, MerkleError, MerkleNode, MerkleProof, MerkleTree};
pub use transaction::{
    decode_batch, encode_batch, sort_by_timestamp, Transaction, TransactionError,
    TransactionInput, TransactionOutput, COINBASE_OUTPUT_INDEX,
};
