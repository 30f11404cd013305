//! RelayVote Voting Engine
//!
//! Threshold voting over external-chain observations:
//! - Content-addressed proposals, one record per observation
//! - Idempotent relayer votes with per-denom quorum
//! - Admin override and admin-managed proposal life
//! - Lazy expiry on next touch
//! - Approved actions run in a buffered scope and commit atomically

pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod genesis;
pub mod identity;
pub mod lifecycle;
pub mod proposal;
pub mod registry;
pub mod router;

pub use dispatcher::*;
pub use engine::*;
pub use events::*;
pub use genesis::*;
pub use identity::*;
pub use lifecycle::*;
pub use proposal::*;
pub use registry::*;
pub use router::*;
