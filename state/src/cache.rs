//! Write-buffering cache over a parent store
//!
//! Reads fall through to the parent unless the key was written in the cache.
//! Writes never reach the parent: the owner drains them with
//! [`CacheStore::into_changes`] and commits them, or drops the cache and they
//! are gone.

use parking_lot::RwLock;
use relayvote_core::{
    RelayVoteResult, StateChange, StateMutator, StateProvider, StateVersion,
};
use std::collections::BTreeMap;

/// Buffered writes over a read-only view of a parent store
pub struct CacheStore<'a> {
    parent: &'a dyn StateProvider,
    // `None` marks a buffered delete
    writes: RwLock<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    batches: RwLock<StateVersion>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a dyn StateProvider) -> Self {
        Self {
            parent,
            writes: RwLock::new(BTreeMap::new()),
            batches: RwLock::new(StateVersion::default()),
        }
    }

    /// Number of buffered writes and deletes
    pub fn len(&self) -> usize {
        self.writes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.read().is_empty()
    }

    /// Buffered changes in key order
    pub fn changes(&self) -> Vec<StateChange> {
        self.writes
            .read()
            .iter()
            .map(|(key, value)| to_change(key.clone(), value.clone()))
            .collect()
    }

    /// Consume the cache, yielding its buffered changes in key order
    pub fn into_changes(self) -> Vec<StateChange> {
        self.writes
            .into_inner()
            .into_iter()
            .map(|(key, value)| to_change(key, value))
            .collect()
    }
}

fn to_change(key: Vec<u8>, value: Option<Vec<u8>>) -> StateChange {
    match value {
        Some(value) => StateChange::Set { key, value },
        None => StateChange::Delete { key },
    }
}

impl StateProvider for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> RelayVoteResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.read().get(key) {
            return Ok(buffered.clone());
        }
        self.parent.get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> RelayVoteResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan_prefix(prefix)?.into_iter().collect();

        for (key, value) in self.writes.read().iter() {
            if !key.starts_with(prefix) {
                continue;
            }
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl StateMutator for CacheStore<'_> {
    fn set(&self, key: &[u8], value: &[u8]) -> RelayVoteResult<()> {
        self.writes.write().insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> RelayVoteResult<()> {
        self.writes.write().insert(key.to_vec(), None);
        Ok(())
    }

    /// Buffers the batch; the returned version counts batches applied to this cache
    fn apply_batch(&self, changes: Vec<StateChange>) -> RelayVoteResult<StateVersion> {
        let mut writes = self.writes.write();
        for change in changes {
            match change {
                StateChange::Set { key, value } => {
                    writes.insert(key, Some(value));
                }
                StateChange::Delete { key } => {
                    writes.insert(key, None);
                }
            }
        }

        let mut batches = self.batches.write();
        *batches = batches.next();
        Ok(*batches)
    }
}
