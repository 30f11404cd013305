//! RelayVote CLI library: HTTP client and argument helpers

pub mod commands;

pub use commands::*;
