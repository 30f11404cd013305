//! RelayVote Node Implementation
//!
//! Node binary that combines:
//! - Memory or sled-backed state
//! - Voting engine with bridge handlers
//! - Height clock and single-writer runtime
//! - HTTP API

mod api;
mod node;
mod runtime;
mod store;

pub use api::*;
pub use node::*;
pub use runtime::*;
pub use store::*;
