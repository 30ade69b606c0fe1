//! Versioned binary framing for ledger objects.
//!
//! Every encoded object starts with a two-byte header:
//!
//! ```text
//! +---------+------+------------------------------+
//! | version | kind | bincode payload ...          |
//! +---------+------+------------------------------+
//!   1 byte   1 byte
//! ```
//!
//! The payload uses fixed-width little-endian integers and `u64` length prefixes for every
//! sequence and byte string. Trailing bytes after the payload are rejected. Any change to a
//! payload layout must bump [`ENCODING_VERSION`].

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Current version of the on-wire layout.
pub const ENCODING_VERSION: u8 = 1;

/// Length of the frame header in bytes.
pub const HEADER_LEN: usize = 2;

/// The type of object carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadKind {
    Transaction = 1,
    Block = 2,
    BlockShort = 3,
    TransactionBatch = 4,
}

impl TryFrom<u8> for PayloadKind {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(Self::Transaction),
            2 => Ok(Self::Block),
            3 => Ok(Self::BlockShort),
            4 => Ok(Self::TransactionBatch),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transaction => "transaction",
            Self::Block => "block",
            Self::BlockShort => "block-short",
            Self::TransactionBatch => "transaction-batch",
        };
        f.write_str(name)
    }
}

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("input too short for a frame header ({0} bytes)")]
    Truncated(usize),

    #[error("encoding version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },

    #[error("unknown payload kind tag {0}")]
    UnknownKind(u8),

    #[error("unexpected payload kind: expected {expected}, found {found}")]
    UnexpectedKind {
        expected: PayloadKind,
        found: PayloadKind,
    },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

impl CodecError {
    /// True for every error a decoder can return, as opposed to an encoding failure.
    pub fn is_decoding_failure(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_little_endian()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode `value` as a payload without the frame header.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Encode `value` inside a frame of the given kind.
pub fn encode<T: Serialize + ?Sized>(kind: PayloadKind, value: &T) -> Result<Vec<u8>> {
    let size = options()
        .serialized_size(value)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + size as usize);
    out.push(ENCODING_VERSION);
    out.push(kind as u8);
    options()
        .serialize_into(&mut out, value)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(out)
}

/// Check the frame header and return the payload slice.
pub fn open_frame(expected: PayloadKind, bytes: &[u8]) -> Result<&[u8]> {
    let [version, tag, payload @ ..] = bytes else {
        return Err(CodecError::Truncated(bytes.len()));
    };

    if *version != ENCODING_VERSION {
        tracing::warn!(found = *version, expected = ENCODING_VERSION, "rejected frame version");
        return Err(CodecError::VersionMismatch {
            expected: ENCODING_VERSION,
            found: *version,
        });
    }

    let found = PayloadKind::try_from(*tag)?;
    if found != expected {
        tracing::warn!(%expected, %found, "rejected frame kind");
        return Err(CodecError::UnexpectedKind { expected, found });
    }

    Ok(payload)
}

/// Decode a frame of the given kind.
pub fn decode<T: DeserializeOwned>(kind: PayloadKind, bytes: &[u8]) -> Result<T> {
    let payload = open_frame(kind, bytes)?;
    options()
        .deserialize(payload)
        .map_err(|e| CodecError::Malformed(e.to_string()))
}
