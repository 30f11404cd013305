//! Proposal lifecycle: the `proposal_life` parameter and expiry
//!
//! The parameter lives in the replicated store as a versioned value. Every
//! call that needs it reads it from the store and passes it on explicitly;
//! nothing caches it between calls.

use relayvote_core::{Height, RelayVoteError, RelayVoteResult, StateMutator, StateProvider};
use relayvote_state::{get_typed, set_typed};
use serde::{Deserialize, Serialize};

use crate::proposal::Proposal;

const PROPOSAL_LIFE_KEY: &[u8] = b"params:proposal_life";

/// Versioned proposal life, in heights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalLifeParam {
    pub value: u64,
    /// Bumped on every change
    pub version: u64,
}

impl ProposalLifeParam {
    pub fn new(value: u64) -> Self {
        Self { value, version: 0 }
    }

    /// The next version of this parameter carrying `value`
    pub fn updated(&self, value: u64) -> Self {
        Self {
            value,
            version: self.version + 1,
        }
    }
}

/// True once `height` is past the proposal's last voting height
pub fn is_expired(proposal: &Proposal, height: Height) -> bool {
    height > proposal.expire_height()
}

/// Read the current proposal life; `fallback` applies when it was never set
pub fn proposal_life(
    state: &(impl StateProvider + ?Sized),
    fallback: u64,
) -> RelayVoteResult<ProposalLifeParam> {
    Ok(get_typed(state, PROPOSAL_LIFE_KEY)?.unwrap_or_else(|| ProposalLifeParam::new(fallback)))
}

/// Read the stored proposal life, if any
pub fn stored_proposal_life(
    state: &(impl StateProvider + ?Sized),
) -> RelayVoteResult<Option<ProposalLifeParam>> {
    get_typed(state, PROPOSAL_LIFE_KEY)
}

/// Write a new proposal life value, bumping its version
pub fn store_proposal_life(
    state: &(impl StateMutator + ?Sized),
    value: u64,
    fallback: u64,
) -> RelayVoteResult<ProposalLifeParam> {
    if value == 0 {
        return Err(RelayVoteError::InvalidParam(
            "proposal life must be at least one height".into(),
        ));
    }
    let param = match stored_proposal_life(state)? {
        Some(current) => current.updated(value),
        None => ProposalLifeParam::new(fallback).updated(value),
    };
    set_typed(state, PROPOSAL_LIFE_KEY, &param)?;
    Ok(param)
}
