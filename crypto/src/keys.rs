//! Key management for RelayVote
//!
//! Relayer and admin principals are addresses derived from Ed25519 public keys.

use ed25519_dalek::{SigningKey as Ed25519SigningKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use relayvote_core::{Address, PublicKey, RelayVoteError, RelayVoteResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::hashing::blake3_hash;

/// A keypair identifying a relayer or admin
#[derive(Clone)]
pub struct KeyPair {
    signing_key: Ed25519SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create keypair from seed bytes
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = Ed25519SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create keypair from secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> RelayVoteResult<Self> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(RelayVoteError::InvalidParam(format!(
                "secret key must be {} bytes",
                SECRET_KEY_LENGTH
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(bytes);
        Ok(Self::from_seed(&seed))
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        PublicKey::from_bytes(verifying_key.to_bytes())
    }

    /// Get the address (hash of public key)
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key())
    }

    /// Get the secret key bytes
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// Derive address from public key using BLAKE3 hash
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let hash = blake3_hash(public_key.as_bytes());
    Address::from_bytes(*hash.as_bytes())
}

/// On-disk key file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    pub public_key: String,
    pub address: String,
    pub secret_key: String,
}

impl KeyFile {
    pub fn to_keypair(&self) -> RelayVoteResult<KeyPair> {
        let bytes = hex::decode(&self.secret_key)
            .map_err(|e| RelayVoteError::InvalidParam(format!("secret key: {}", e)))?;
        let keypair = KeyPair::from_secret_bytes(&bytes)?;
        let address = keypair.address().to_hex();
        if self.address.trim_start_matches("0x") != address {
            return Err(RelayVoteError::InvalidParam(format!(
                "key file address {} does not match its secret key",
                self.address
            )));
        }
        Ok(keypair)
    }

    pub fn load(path: &Path) -> RelayVoteResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RelayVoteError::DeserializationError(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> RelayVoteResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl From<&KeyPair> for KeyFile {
    fn from(keypair: &KeyPair) -> Self {
        Self {
            public_key: keypair.public_key().to_hex(),
            address: keypair.address().to_hex(),
            secret_key: hex::encode(keypair.secret_bytes()),
        }
    }
}
