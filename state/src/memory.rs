//! In-memory state store for tests and ephemeral nodes

use dashmap::DashMap;
use parking_lot::RwLock;
use relayvote_core::{
    RelayVoteResult, StateChange, StateMutator, StateProvider, StateVersion,
};

use crate::store::StateStore;

/// Concurrent map plus a version counter.
///
/// `apply_batch` holds the version lock for the whole batch, so two batches
/// never interleave.
pub struct MemoryStateStore {
    data: DashMap<Vec<u8>, Vec<u8>>,
    version: RwLock<StateVersion>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            version: RwLock::new(StateVersion::new(0)),
        }
    }

    /// Seed a store without bumping its version
    pub fn with_data(data: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            data: data.into_iter().collect(),
            version: RwLock::new(StateVersion::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateProvider for MemoryStateStore {
    fn get(&self, key: &[u8]) -> RelayVoteResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    fn exists(&self, key: &[u8]) -> RelayVoteResult<bool> {
        Ok(self.data.contains_key(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> RelayVoteResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

impl StateMutator for MemoryStateStore {
    fn set(&self, key: &[u8], value: &[u8]) -> RelayVoteResult<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> RelayVoteResult<()> {
        self.data.remove(key);
        Ok(())
    }

    fn apply_batch(&self, changes: Vec<StateChange>) -> RelayVoteResult<StateVersion> {
        let mut version = self.version.write();

        for change in changes {
            match change {
                StateChange::Set { key, value } => {
                    self.data.insert(key, value);
                }
                StateChange::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }

        *version = version.next();
        Ok(*version)
    }
}

impl StateStore for MemoryStateStore {
    fn version(&self) -> StateVersion {
        *self.version.read()
    }
}
