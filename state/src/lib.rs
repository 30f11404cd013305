//! RelayVote State Management
//!
//! Provides the key-value substrate the voting engine runs against:
//! an in-memory store, a sled-backed persistent store, and a
//! write-buffering cache used as an isolated, rollback-capable scope.
//! State = { key → value }

pub mod store;
pub mod memory;
pub mod persistent;
pub mod cache;

pub use store::*;
pub use memory::*;
pub use persistent::*;
pub use cache::*;
