//! RelayVote Cryptography Module
//!
//! Provides the primitives the voting engine relies on:
//! - BLAKE3 for content-addressed proposal identifiers
//! - Ed25519 key pairs from which relayer and admin addresses are derived

pub mod keys;
pub mod hashing;

pub use keys::*;
pub use hashing::*;
