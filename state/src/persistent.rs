//! sled-backed state store

use parking_lot::RwLock;
use relayvote_core::{
    RelayVoteError, RelayVoteResult, StateChange, StateMutator, StateProvider, StateVersion,
};
use sled::transaction::ConflictableTransactionResult;
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::debug;

use crate::store::StateStore;

const STATE_TREE: &str = "state";
const META_TREE: &str = "meta";
const VERSION_KEY: &[u8] = b"version";

fn storage_err(e: sled::Error) -> RelayVoteError {
    RelayVoteError::StorageError(e.to_string())
}

/// Persistent state store backed by sled database
pub struct PersistentStateStore {
    db: Db,
    state: Tree,
    meta: Tree,
    version: RwLock<StateVersion>,
}

impl PersistentStateStore {
    pub fn open<P: AsRef<Path>>(path: P) -> RelayVoteResult<Self> {
        let db = sled::open(path).map_err(storage_err)?;
        let state = db.open_tree(STATE_TREE).map_err(storage_err)?;
        let meta = db.open_tree(META_TREE).map_err(storage_err)?;

        let version = match meta.get(VERSION_KEY).map_err(storage_err)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    RelayVoteError::StorageError("corrupt state version record".into())
                })?;
                StateVersion::new(u64::from_le_bytes(raw))
            }
            None => StateVersion::new(0),
        };

        debug!("Opened persistent store at version {}", version);

        Ok(Self {
            db,
            state,
            meta,
            version: RwLock::new(version),
        })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> RelayVoteResult<()> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }

    /// Number of state entries
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl StateProvider for PersistentStateStore {
    fn get(&self, key: &[u8]) -> RelayVoteResult<Option<Vec<u8>>> {
        self.state
            .get(key)
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(storage_err)
    }

    fn exists(&self, key: &[u8]) -> RelayVoteResult<bool> {
        self.state.contains_key(key).map_err(storage_err)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> RelayVoteResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.state
            .scan_prefix(prefix)
            .map(|result| result.map(|(key, value)| (key.to_vec(), value.to_vec())))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err)
    }
}

impl StateMutator for PersistentStateStore {
    fn set(&self, key: &[u8], value: &[u8]) -> RelayVoteResult<()> {
        self.state.insert(key, value).map_err(storage_err)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> RelayVoteResult<()> {
        self.state.remove(key).map_err(storage_err)?;
        Ok(())
    }

    fn apply_batch(&self, changes: Vec<StateChange>) -> RelayVoteResult<StateVersion> {
        let mut version = self.version.write();
        let new_version = version.next();

        let mut batch = sled::Batch::default();
        for change in changes {
            match change {
                StateChange::Set { key, value } => batch.insert(key, value),
                StateChange::Delete { key } => batch.remove(key),
            }
        }

        // State changes and the new version land together or not at all
        (&self.state, &self.meta)
            .transaction(|(state, meta)| -> ConflictableTransactionResult<()> {
                state.apply_batch(&batch)?;
                meta.insert(VERSION_KEY, new_version.0.to_le_bytes().to_vec())?;
                Ok(())
            })
            .map_err(|e| RelayVoteError::StorageError(format!("{:?}", e)))?;

        self.db.flush().map_err(storage_err)?;

        *version = new_version;
        Ok(new_version)
    }
}

impl StateStore for PersistentStateStore {
    fn version(&self) -> StateVersion {
        *self.version.read()
    }
}
