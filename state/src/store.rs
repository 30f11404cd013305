//! Core state store traits and types

use relayvote_core::{
    Hash, RelayVoteError, RelayVoteResult, StateMutator, StateProvider, StateRoot,
    StateVersion,
};
use relayvote_crypto::hashing::{hash_multiple, merkle_root};
use serde::{de::DeserializeOwned, Serialize};

/// State entry for merkle tree computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl StateEntry {
    pub fn hash(&self) -> Hash {
        let key_len = (self.key.len() as u64).to_le_bytes();
        hash_multiple(&[key_len.as_slice(), self.key.as_slice(), self.value.as_slice()])
    }
}

/// Compute state root from entries
pub fn compute_state_root(entries: &[StateEntry]) -> StateRoot {
    if entries.is_empty() {
        return Hash::ZERO;
    }

    // Sort entries by key for deterministic ordering
    let mut sorted: Vec<_> = entries.iter().collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));

    let leaves: Vec<Hash> = sorted.iter().map(|e| e.hash()).collect();

    merkle_root(&leaves)
}

/// Store that can be committed to and inspected as a whole
pub trait StateStore: StateMutator {
    /// Current store version
    fn version(&self) -> StateVersion;

    /// Get all entries for state root computation
    fn all_entries(&self) -> RelayVoteResult<Vec<StateEntry>> {
        Ok(self
            .scan_prefix(&[])?
            .into_iter()
            .map(|(key, value)| StateEntry { key, value })
            .collect())
    }

    /// Compute current state root
    fn compute_root(&self) -> RelayVoteResult<StateRoot> {
        let entries = self.all_entries()?;
        Ok(compute_state_root(&entries))
    }
}

/// Encode a value for storage
pub fn encode_value<T: Serialize>(value: &T) -> RelayVoteResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| RelayVoteError::SerializationError(e.to_string()))
}

/// Decode a stored value
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> RelayVoteResult<T> {
    bincode::deserialize(bytes).map_err(|e| RelayVoteError::DeserializationError(e.to_string()))
}

/// Read and decode a typed value
pub fn get_typed<T: DeserializeOwned>(
    store: &(impl StateProvider + ?Sized),
    key: &[u8],
) -> RelayVoteResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(decode_value(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write a typed value
pub fn set_typed<T: Serialize>(
    store: &(impl StateMutator + ?Sized),
    key: &[u8],
    value: &T,
) -> RelayVoteResult<()> {
    store.set(key, &encode_value(value)?)
}

/// Build a key from a prefix and segments; every segment but the last is
/// length-prefixed so distinct segment lists never produce the same key
pub fn compose_key(prefix: &[u8], segments: &[&[u8]]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    if let Some((last, init)) = segments.split_last() {
        for segment in init {
            key.extend_from_slice(&(segment.len() as u32).to_be_bytes());
            key.extend_from_slice(segment);
        }
        key.extend_from_slice(last);
    }
    key
}
