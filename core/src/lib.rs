//! RelayVote Core Library
//! 
//! Core types, traits, and abstractions shared by the RelayVote crates.
//! This crate provides the foundation for the voting engine, the state
//! substrate and the action handlers.

pub mod types;
pub mod action;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use action::*;
pub use traits::*;
pub use error::*;
pub use config::*;
