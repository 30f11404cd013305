//! Store selected by configuration

use relayvote_core::{
    RelayVoteResult, StateChange, StateMutator, StateProvider, StateVersion,
};
use relayvote_state::{MemoryStateStore, PersistentStateStore, StateStore};
use std::path::Path;

/// In-memory or sled-backed state, chosen at startup
pub enum NodeStore {
    Memory(MemoryStateStore),
    Persistent(PersistentStateStore),
}

impl NodeStore {
    pub fn memory() -> Self {
        NodeStore::Memory(MemoryStateStore::new())
    }

    pub fn open(path: impl AsRef<Path>) -> RelayVoteResult<Self> {
        Ok(NodeStore::Persistent(PersistentStateStore::open(path)?))
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, NodeStore::Persistent(_))
    }

    /// Flush pending writes to disk; no-op in memory
    pub fn flush(&self) -> RelayVoteResult<()> {
        match self {
            NodeStore::Memory(_) => Ok(()),
            NodeStore::Persistent(store) => store.flush(),
        }
    }
}

impl StateProvider for NodeStore {
    fn get(&self, key: &[u8]) -> RelayVoteResult<Option<Vec<u8>>> {
        match self {
            NodeStore::Memory(store) => store.get(key),
            NodeStore::Persistent(store) => store.get(key),
        }
    }

    fn exists(&self, key: &[u8]) -> RelayVoteResult<bool> {
        match self {
            NodeStore::Memory(store) => store.exists(key),
            NodeStore::Persistent(store) => store.exists(key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> RelayVoteResult<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            NodeStore::Memory(store) => store.scan_prefix(prefix),
            NodeStore::Persistent(store) => store.scan_prefix(prefix),
        }
    }
}

impl StateMutator for NodeStore {
    fn set(&self, key: &[u8], value: &[u8]) -> RelayVoteResult<()> {
        match self {
            NodeStore::Memory(store) => store.set(key, value),
            NodeStore::Persistent(store) => store.set(key, value),
        }
    }

    fn delete(&self, key: &[u8]) -> RelayVoteResult<()> {
        match self {
            NodeStore::Memory(store) => store.delete(key),
            NodeStore::Persistent(store) => store.delete(key),
        }
    }

    fn apply_batch(&self, changes: Vec<StateChange>) -> RelayVoteResult<StateVersion> {
        match self {
            NodeStore::Memory(store) => store.apply_batch(changes),
            NodeStore::Persistent(store) => store.apply_batch(changes),
        }
    }
}

impl StateStore for NodeStore {
    fn version(&self) -> StateVersion {
        match self {
            NodeStore::Memory(store) => store.version(),
            NodeStore::Persistent(store) => store.version(),
        }
    }
}
