//! Proposal records and their storage

use relayvote_core::{
    Address, Height, ProposalContent, ProposalId, RelayVoteResult, StateChange, StateMutator,
    StateProvider,
};
use relayvote_state::{compose_key, decode_value, encode_value, get_typed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::identity::identify;
use crate::lifecycle::is_expired;

const PROPOSAL_PREFIX: &[u8] = b"proposal:";

/// Proposal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Collecting votes
    Active,
    /// Quorum reached or admin override; action executed
    Approved,
    /// Life ran out before approval
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deduplicated observation plus its accumulated votes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub content: ProposalContent,
    pub voters: BTreeSet<Address>,
    pub status: ProposalStatus,
    /// Height of the first submission
    pub created_at: Height,
    /// Proposal life in force when the record was created
    pub life: u64,
}

impl Proposal {
    pub fn new(content: ProposalContent, created_at: Height, life: u64) -> RelayVoteResult<Self> {
        Ok(Self {
            id: identify(&content)?,
            content,
            voters: BTreeSet::new(),
            status: ProposalStatus::Active,
            created_at,
            life,
        })
    }

    /// Record a vote; returns false if the voter already voted or the
    /// proposal has left `Active`
    pub fn add_voter(&mut self, voter: Address) -> bool {
        if self.status != ProposalStatus::Active {
            return false;
        }
        self.voters.insert(voter)
    }

    pub fn vote_count(&self) -> usize {
        self.voters.len()
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    /// Last height at which the proposal still accepts votes
    pub fn expire_height(&self) -> Height {
        self.created_at.saturating_add(self.life)
    }

    pub fn is_expired(&self, height: Height) -> bool {
        is_expired(self, height)
    }

    /// Active -> Approved; no-op from a terminal status
    pub fn approve(&mut self) {
        if self.status == ProposalStatus::Active {
            self.status = ProposalStatus::Approved;
        }
    }

    /// Active -> Expired; no-op from a terminal status
    pub fn expire(&mut self) {
        if self.status == ProposalStatus::Active {
            self.status = ProposalStatus::Expired;
        }
    }
}

/// Key schema and access for proposal records
pub struct ProposalStore;

impl ProposalStore {
    pub fn key(id: &ProposalId) -> Vec<u8> {
        compose_key(PROPOSAL_PREFIX, &[id.as_bytes()])
    }

    pub fn get(
        state: &(impl StateProvider + ?Sized),
        id: &ProposalId,
    ) -> RelayVoteResult<Option<Proposal>> {
        get_typed(state, &Self::key(id))
    }

    pub fn set(state: &(impl StateMutator + ?Sized), proposal: &Proposal) -> RelayVoteResult<()> {
        state.set(&Self::key(&proposal.id), &encode_value(proposal)?)
    }

    /// The write that persists `proposal`, for inclusion in a larger batch
    pub fn change(proposal: &Proposal) -> RelayVoteResult<StateChange> {
        Ok(StateChange::Set {
            key: Self::key(&proposal.id),
            value: encode_value(proposal)?,
        })
    }

    /// All proposals in ID order
    pub fn all(state: &(impl StateProvider + ?Sized)) -> RelayVoteResult<Vec<Proposal>> {
        state
            .scan_prefix(PROPOSAL_PREFIX)?
            .into_iter()
            .map(|(_, bytes)| decode_value(&bytes))
            .collect()
    }
}
