//! RelayVote bridge module
//!
//! Concrete handlers for approved proposals:
//! - Deposit credit with source-tx replay protection
//! - Monotonic chain era
//! - Exchange rate updates

pub mod handlers;
pub mod ledger;

pub use handlers::*;
pub use ledger::*;
