//! Chain parameters shared by transaction and block construction.

use serde::{Deserialize, Serialize};

/// Value paid to the recipient of a coinbase transaction.
pub const BLOCK_REWARD: u64 = 10;

/// Number of random bytes drawn for a coinbase nonce when the caller supplies none.
pub const COINBASE_NONCE_LEN: usize = 20;

/// Parameters that every node on a network must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Reward paid by each coinbase transaction.
    pub block_reward: u64,
    /// Random bytes used for an empty coinbase nonce. The nonce stored is their hex encoding.
    pub coinbase_nonce_len: usize,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            block_reward: BLOCK_REWARD,
            coinbase_nonce_len: COINBASE_NONCE_LEN,
        }
    }
}

impl ChainParams {
    /// Load parameters from JSON. Fields that are missing keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ChainParams::default();
        assert_eq!(params.block_reward, 10);
        assert_eq!(params.coinbase_nonce_len, 20);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params = ChainParams::from_json(r#"{ "block_reward": 50 }"#).unwrap();
        assert_eq!(params.block_reward, 50);
        assert_eq!(params.coinbase_nonce_len, COINBASE_NONCE_LEN);
    }

    #[test]
    fn test_json_roundtrip() {
        let params = ChainParams {
            block_reward: 25,
            coinbase_nonce_len: 8,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(ChainParams::from_json(&json).unwrap(), params);
    }

    #[test]
    fn test_invalid_json() {
        assert!(ChainParams::from_json(r#"{ "block_reward": "lots" }"#).is_err());
    }
}
