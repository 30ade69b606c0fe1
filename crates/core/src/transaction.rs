//! Transactions: inputs spending earlier outputs, outputs locking value to a recipient,
//! and an optional database command to run once the transaction is confirmed.

use crate::codec::{self, CodecError, PayloadKind};
use crate::config::ChainParams;
use crate::crypto::{hash_pub_key, Address, CryptoError, Keypair, PublicKey};
use crate::hash::{hash, Hash};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Output index carried by a coinbase input, which spends nothing.
pub const COINBASE_OUTPUT_INDEX: i64 = -1;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("invalid recipient address")]
    InvalidAddress,
    #[error("secure random source unavailable: {0}")]
    RandomSourceUnavailable(#[source] rand::Error),
    #[error("input {input} is missing its signature")]
    MissingSignature { input: usize },
    #[error("input {input} carries a malformed public key or signature")]
    InvalidSignature { input: usize },
    #[error("signature verification failed for input {input}")]
    VerificationFailed { input: usize },
}

pub type Result<T> = std::result::Result<T, TransactionError>;

/// Current Unix time in seconds.
///
/// A system clock set before the Unix epoch yields `0`.
pub fn current_timestamp() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(err) => {
            tracing::warn!(behind = ?err.duration(), "system clock is before the Unix epoch");
            0
        }
    }
}

/// A reference to an output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Id of the transaction holding the spent output. Empty for coinbase.
    pub source_tx_id: Vec<u8>,
    /// Index of the spent output, or [`COINBASE_OUTPUT_INDEX`].
    pub source_output_index: i64,
    /// Signature over the transaction's signing hash. Empty for coinbase.
    pub signature: Vec<u8>,
    /// The spender's public key. A coinbase input carries its nonce here instead.
    pub unlocking_data: Vec<u8>,
}

impl TransactionInput {
    /// An unsigned input spending `source_output_index` of `source_tx_id`.
    pub fn new(source_tx_id: Hash, source_output_index: u32) -> Self {
        Self {
            source_tx_id: source_tx_id.0.to_vec(),
            source_output_index: i64::from(source_output_index),
            signature: Vec::new(),
            unlocking_data: Vec::new(),
        }
    }

    /// The single input of a coinbase transaction.
    pub fn coinbase(data: impl Into<Vec<u8>>) -> Self {
        Self {
            source_tx_id: Vec::new(),
            source_output_index: COINBASE_OUTPUT_INDEX,
            signature: Vec::new(),
            unlocking_data: data.into(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.source_output_index == COINBASE_OUTPUT_INDEX
    }

    /// Check whether this input was unlocked by the key hashing to `pub_key_hash`.
    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        !self.is_coinbase() && hash_pub_key(&self.unlocking_data).as_slice() == pub_key_hash
    }
}

/// Value locked to a recipient until a later input spends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    /// Public key hash of the recipient.
    pub recipient_hash: Vec<u8>,
}

impl TransactionOutput {
    /// Lock `value` to a hex-encoded recipient address.
    pub fn new(value: u64, address: &str) -> Result<Self> {
        let address = Address::from_hex(address).map_err(|_| TransactionError::InvalidAddress)?;
        Ok(Self::locked_to(value, &address))
    }

    pub fn locked_to(value: u64, address: &Address) -> Self {
        Self {
            value,
            recipient_hash: address.as_bytes().to_vec(),
        }
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.recipient_hash == pub_key_hash
    }
}

/// A transaction recorded on the ledger.
///
/// Fields are fixed at construction; the id is the hash of the encoded transaction with
/// the id itself zeroed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
    /// Unix timestamp in seconds.
    timestamp: i64,
    /// Database command executed once the transaction is confirmed. May be empty.
    attached_command: Vec<u8>,
    id: Hash,
}

impl Transaction {
    /// Create a transaction stamped with the current time.
    ///
    /// Inputs and outputs are stored as given. Balances and signatures are not checked here.
    pub fn new(
        command: impl Into<Vec<u8>>,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
    ) -> Result<Self> {
        Self::new_at(command, inputs, outputs, current_timestamp())
    }

    /// Create a transaction with an explicit timestamp.
    pub fn new_at(
        command: impl Into<Vec<u8>>,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        timestamp: i64,
    ) -> Result<Self> {
        let mut tx = Self {
            inputs,
            outputs,
            timestamp,
            attached_command: command.into(),
            id: Hash::ZERO,
        };
        tx.id = tx.compute_id()?;

        tracing::debug!(
            id = %tx.id,
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            command_len = tx.attached_command.len(),
            "created transaction"
        );
        Ok(tx)
    }

    /// Create the coinbase transaction paying the block reward to `recipient`.
    ///
    /// An empty `data` is replaced by a random hex nonce drawn from the OS.
    pub fn new_coinbase(recipient: &str, data: &str) -> Result<Self> {
        Self::new_coinbase_with(
            &ChainParams::default(),
            &mut OsRng,
            recipient,
            data,
            current_timestamp(),
        )
    }

    /// Create a coinbase transaction with explicit parameters, random source and timestamp.
    pub fn new_coinbase_with<R: RngCore + CryptoRng>(
        params: &ChainParams,
        rng: &mut R,
        recipient: &str,
        data: &str,
        timestamp: i64,
    ) -> Result<Self> {
        let output = TransactionOutput::new(params.block_reward, recipient)?;

        let data = if data.is_empty() {
            let mut nonce = vec![0u8; params.coinbase_nonce_len];
            rng.try_fill_bytes(&mut nonce)
                .map_err(TransactionError::RandomSourceUnavailable)?;
            hex::encode(nonce)
        } else {
            data.to_owned()
        };

        Self::new_at(
            Vec::<u8>::new(),
            vec![TransactionInput::coinbase(data)],
            vec![output],
            timestamp,
        )
    }

    pub fn id(&self) -> Hash {
        self.id
    }

    pub fn inputs(&self) -> &[TransactionInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.outputs
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn attached_command(&self) -> &[u8] {
        &self.attached_command
    }

    /// Check if this is a coinbase transaction: one coinbase input paying one output.
    pub fn is_coinbase(&self) -> bool {
        self.outputs.len() == 1 && matches!(self.inputs.as_slice(), [input] if input.is_coinbase())
    }

    /// Sum of all output values, saturating at `u64::MAX`.
    pub fn total_output_value(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.value))
    }

    /// Re-derive the id from the current contents.
    pub fn compute_id(&self) -> std::result::Result<Hash, CodecError> {
        let mut preimage = self.clone();
        preimage.id = Hash::ZERO;
        Ok(hash(&preimage.serialize()?))
    }

    /// Check that the stored id matches the contents.
    pub fn verify_id(&self) -> std::result::Result<bool, CodecError> {
        Ok(self.compute_id()? == self.id)
    }

    /// Hash signed by every input: the id is zeroed and input signatures and keys are cleared.
    pub fn signing_hash(&self) -> std::result::Result<Hash, CodecError> {
        let mut trimmed = self.clone();
        trimmed.id = Hash::ZERO;
        for input in trimmed.inputs.iter_mut().filter(|input| !input.is_coinbase()) {
            input.signature.clear();
            input.unlocking_data.clear();
        }
        Ok(hash(&trimmed.serialize()?))
    }

    /// Sign every input with `keypair` and recompute the id.
    pub fn signed(mut self, keypair: &Keypair) -> Result<Self> {
        let digest = self.signing_hash()?;
        let signature = keypair.sign_hash(&digest);
        let public_key = keypair.public_key.as_bytes();

        for input in self.inputs.iter_mut().filter(|input| !input.is_coinbase()) {
            input.signature = signature.to_vec();
            input.unlocking_data = public_key.to_vec();
        }
        self.id = self.compute_id()?;
        Ok(self)
    }

    /// Verify the signature of every input against the key it carries.
    pub fn verify_signatures(&self) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let digest = self.signing_hash()?;
        for (index, input) in self.inputs.iter().enumerate() {
            if input.signature.is_empty() {
                return Err(TransactionError::MissingSignature { input: index });
            }
            let key = PublicKey::from_slice(&input.unlocking_data)
                .map_err(|_| TransactionError::InvalidSignature { input: index })?;
            key.verify(&digest, &input.signature).map_err(|err| match err {
                CryptoError::VerificationFailed => {
                    TransactionError::VerificationFailed { input: index }
                }
                _ => TransactionError::InvalidSignature { input: index },
            })?;
        }
        Ok(())
    }

    /// Encode the transaction, id included.
    pub fn serialize(&self) -> std::result::Result<Vec<u8>, CodecError> {
        codec::encode(PayloadKind::Transaction, self)
    }

    /// Decode a transaction produced by [`Transaction::serialize`].
    pub fn deserialize(bytes: &[u8]) -> std::result::Result<Self, CodecError> {
        let tx: Self = codec::decode(PayloadKind::Transaction, bytes)?;
        tx.check_shape()?;
        Ok(tx)
    }

    /// Reject input layouts no honest encoder produces.
    pub(crate) fn check_shape(&self) -> std::result::Result<(), CodecError> {
        for (index, input) in self.inputs.iter().enumerate() {
            if input.source_output_index < COINBASE_OUTPUT_INDEX {
                return Err(CodecError::Malformed(format!(
                    "input {index} has output index {}",
                    input.source_output_index
                )));
            }
            if input.is_coinbase() {
                if !input.source_tx_id.is_empty() {
                    return Err(CodecError::Malformed(format!(
                        "coinbase input {index} references a source transaction"
                    )));
                }
                if !input.signature.is_empty() {
                    return Err(CodecError::Malformed(format!(
                        "coinbase input {index} carries a signature"
                    )));
                }
                if self.inputs.len() != 1 || self.outputs.len() != 1 {
                    return Err(CodecError::Malformed(
                        "coinbase transaction must have one input and one output".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", self.id)?;
        writeln!(f, "     Time:      {}", self.timestamp)?;
        for (index, input) in self.inputs.iter().enumerate() {
            writeln!(f, "     Input {index}:")?;
            writeln!(f, "       TXID:      {}", hex::encode(&input.source_tx_id))?;
            writeln!(f, "       Out:       {}", input.source_output_index)?;
            writeln!(f, "       Signature: {}", hex::encode(&input.signature))?;
            writeln!(f, "       PubKey:    {}", hex::encode(&input.unlocking_data))?;
        }
        for (index, output) in self.outputs.iter().enumerate() {
            writeln!(f, "     Output {index}:")?;
            writeln!(f, "       Value:     {}", output.value)?;
            writeln!(f, "       Recipient: {}", hex::encode(&output.recipient_hash))?;
        }
        write!(
            f,
            "     Command:   {}",
            String::from_utf8_lossy(&self.attached_command)
        )
    }
}

/// Sort transactions by timestamp, oldest first. Equal timestamps keep their order.
pub fn sort_by_timestamp<T: Borrow<Transaction>>(txs: &mut [T]) {
    txs.sort_by_key(|tx| tx.borrow().timestamp);
}

/// Encode a list of transactions as one stored blob.
pub fn encode_batch(txs: &[Transaction]) -> std::result::Result<Vec<u8>, CodecError> {
    codec::encode(PayloadKind::TransactionBatch, txs)
}

/// Decode a blob produced by [`encode_batch`].
pub fn decode_batch(bytes: &[u8]) -> std::result::Result<Vec<Transaction>, CodecError> {
    let txs: Vec<Transaction> = codec::decode(PayloadKind::TransactionBatch, bytes)?;
    for tx in &txs {
        tx.check_shape()?;
    }
    Ok(txs)
}
