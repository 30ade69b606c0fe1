//! Ed25519 keys, signatures and recipient addresses.

use crate::hash::{hash, Hash};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of a public key hash, which is also the raw length of an address.
pub const PUB_KEY_HASH_LEN: usize = 20;

/// Length of an ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid address format")]
    InvalidAddress,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Hash a public key into the 20-byte form outputs are locked to.
///
/// This is the first 20 bytes of the SHA-256 digest of the key.
pub fn hash_pub_key(public_key: &[u8]) -> [u8; PUB_KEY_HASH_LEN] {
    let digest = hash(public_key);
    let mut out = [0u8; PUB_KEY_HASH_LEN];
    out.copy_from_slice(&digest.0[..PUB_KEY_HASH_LEN]);
    out
}

/// A recipient address: the hash of the recipient's public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; PUB_KEY_HASH_LEN]);

impl Address {
    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; PUB_KEY_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_HASH_LEN] {
        &self.0
    }

    /// Convert to a hex string (with 0x prefix).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidAddress)?;
        let arr: [u8; PUB_KEY_HASH_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidAddress)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A public key for signature verification.
#[derive(Clone)]
pub struct PublicKey(pub VerifyingKey);

impl PublicKey {
    /// Parse a public key from its 32 raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Derive the address from this public key.
    pub fn to_address(&self) -> Address {
        Address(hash_pub_key(self.0.as_bytes()))
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify a signature over a digest.
    pub fn verify(&self, digest: &Hash, signature: &[u8]) -> Result<(), CryptoError> {
        let sig = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        self.0
            .verify(digest.as_bytes(), &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

/// A keypair for signing transaction inputs.
pub struct Keypair {
    signing_key: SigningKey,
    pub public_key: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create a keypair from a private key (32 bytes).
    pub fn from_private_key(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = PublicKey(signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    /// Get the address derived from the public key.
    pub fn address(&self) -> Address {
        self.public_key.to_address()
    }

    /// Sign a digest, returning the raw 64-byte signature.
    pub fn sign_hash(&self, digest: &Hash) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(digest.as_bytes()).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::generate();
        let digest = hash(b"payload");
        let sig = keypair.sign_hash(&digest);
        assert!(keypair.public_key.verify(&digest, &sig).is_ok());
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = Keypair::generate();
        let other = Keypair::generate();
        let digest = hash(b"payload");
        let sig = signer.sign_hash(&digest);
        assert_eq!(
            other.public_key.verify(&digest, &sig),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn test_short_signature_rejected() {
        let keypair = Keypair::generate();
        assert_eq!(
            keypair.public_key.verify(&hash(b"x"), &[0u8; 10]),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_deterministic_keypair() {
        let a = Keypair::from_private_key(&[7u8; 32]);
        let b = Keypair::from_private_key(&[7u8; 32]);
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn test_address_from_public_key_bytes() {
        let keypair = Keypair::generate();
        let parsed = PublicKey::from_slice(&keypair.public_key.as_bytes()).unwrap();
        assert_eq!(parsed.to_address(), keypair.address());
        assert_eq!(
            keypair.address().0,
            hash_pub_key(&keypair.public_key.as_bytes())
        );
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_bytes([0xab; 20]);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
        assert_eq!(Address::from_hex(&hex::encode([0xab; 20])).unwrap(), addr);
    }

    #[test]
    fn test_address_invalid() {
        assert_eq!(Address::from_hex("0x1234"), Err(CryptoError::InvalidAddress));
        assert_eq!(Address::from_hex("not hex"), Err(CryptoError::InvalidAddress));
    }
}
