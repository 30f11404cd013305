//! Core traits defining RelayVote interfaces
//!
//! These traits are the contracts between the voting engine and the
//! collaborators it runs against: the replicated store and the registries.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Result type for RelayVote operations
pub type RelayVoteResult<T> = Result<T, crate::error::RelayVoteError>;

/// Read access to the replicated key-value store
pub trait StateProvider: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> RelayVoteResult<Option<Vec<u8>>>;

    /// Check if a key exists
    fn exists(&self, key: &[u8]) -> RelayVoteResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> RelayVoteResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Write access to the replicated key-value store
pub trait StateMutator: StateProvider {
    /// Set a value
    fn set(&self, key: &[u8], value: &[u8]) -> RelayVoteResult<()>;

    /// Delete a key
    fn delete(&self, key: &[u8]) -> RelayVoteResult<()>;

    /// Apply a batch of changes atomically
    fn apply_batch(&self, changes: Vec<StateChange>) -> RelayVoteResult<StateVersion>;
}

/// State change operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl StateChange {
    pub fn key(&self) -> &[u8] {
        match self {
            StateChange::Set { key, .. } | StateChange::Delete { key } => key,
        }
    }
}

/// Answers whether a principal may act for an asset, and the asset's quorum
pub trait RelayerRegistry: Send + Sync {
    /// Is `address` an active relayer for `denom`
    fn is_relayer(&self, denom: &str, address: &Address) -> RelayVoteResult<bool>;

    /// Quorum size for `denom`, `None` when the denom is unregistered
    fn threshold(&self, denom: &str) -> RelayVoteResult<Option<u32>>;
}

/// Answers whether a principal is a privileged administrator
pub trait AdminRegistry: Send + Sync {
    fn is_admin(&self, address: &Address) -> RelayVoteResult<bool>;
}
