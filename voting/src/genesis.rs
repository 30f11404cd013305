//! Genesis import/export for the voting state

use relayvote_core::{Address, RelayVoteError, RelayVoteResult};
use relayvote_state::{CacheStore, StateStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::identity::identify;
use crate::lifecycle::{store_proposal_life, stored_proposal_life};
use crate::proposal::{Proposal, ProposalStore};
use crate::registry::{
    list_admins, list_all_relayers, list_thresholds, put_admin, put_relayer, put_threshold,
};

/// Relayer set of one denom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisRelayers {
    pub denom: String,
    pub addresses: Vec<Address>,
}

/// Quorum of one denom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisThreshold {
    pub denom: String,
    pub value: u32,
}

/// Genesis state of the voting module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    /// Proposal life; the node default applies when absent
    pub proposal_life: Option<u64>,
    pub admins: Vec<Address>,
    pub relayers: Vec<GenesisRelayers>,
    pub thresholds: Vec<GenesisThreshold>,
    pub proposals: Vec<Proposal>,
}

impl GenesisState {
    /// Single-admin genesis for local development
    pub fn devnet(admin: Address) -> Self {
        Self {
            admins: vec![admin],
            ..Default::default()
        }
    }

    pub fn with_relayers(mut self, denom: &str, addresses: Vec<Address>, threshold: u32) -> Self {
        self.relayers.push(GenesisRelayers {
            denom: denom.to_string(),
            addresses,
        });
        self.thresholds.push(GenesisThreshold {
            denom: denom.to_string(),
            value: threshold,
        });
        self
    }

    pub fn validate(&self) -> RelayVoteResult<()> {
        if self.proposal_life == Some(0) {
            return Err(RelayVoteError::InvalidParam(
                "genesis proposal life must be positive".into(),
            ));
        }
        for threshold in &self.thresholds {
            if threshold.value == 0 {
                return Err(RelayVoteError::InvalidParam(format!(
                    "genesis threshold for {} must be positive",
                    threshold.denom
                )));
            }
        }
        for proposal in &self.proposals {
            if proposal.id != identify(&proposal.content)? {
                return Err(RelayVoteError::InvalidParam(format!(
                    "genesis proposal {} does not match its content",
                    proposal.id
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> RelayVoteResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RelayVoteError::SerializationError(e.to_string()))
    }

    pub fn from_json(json: &str) -> RelayVoteResult<Self> {
        serde_json::from_str(json).map_err(|e| RelayVoteError::DeserializationError(e.to_string()))
    }
}

/// Write `genesis` into `state` as one batch
pub fn init_genesis<S: StateStore>(state: &S, genesis: &GenesisState) -> RelayVoteResult<()> {
    genesis.validate()?;

    let cache = CacheStore::new(state);
    if let Some(life) = genesis.proposal_life {
        store_proposal_life(&cache, life, life)?;
    }
    for admin in &genesis.admins {
        put_admin(&cache, admin)?;
    }
    for group in &genesis.relayers {
        for address in &group.addresses {
            put_relayer(&cache, &group.denom, address)?;
        }
    }
    for threshold in &genesis.thresholds {
        put_threshold(&cache, &threshold.denom, threshold.value)?;
    }
    for proposal in &genesis.proposals {
        ProposalStore::set(&cache, proposal)?;
    }
    state.apply_batch(cache.into_changes())?;

    info!(
        "Genesis loaded: {} admins, {} relayer sets, {} proposals",
        genesis.admins.len(),
        genesis.relayers.len(),
        genesis.proposals.len()
    );
    Ok(())
}

/// Read the voting state back out in genesis form
pub fn export_genesis<S: StateStore>(state: &S) -> RelayVoteResult<GenesisState> {
    Ok(GenesisState {
        proposal_life: stored_proposal_life(state)?.map(|param| param.value),
        admins: list_admins(state)?,
        relayers: list_all_relayers(state)?
            .into_iter()
            .map(|(denom, addresses)| GenesisRelayers { denom, addresses })
            .collect(),
        thresholds: list_thresholds(state)?
            .into_iter()
            .map(|(denom, value)| GenesisThreshold { denom, value })
            .collect(),
        proposals: ProposalStore::all(state)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::ProposalStatus;
    use relayvote_core::{Action, Height, ProposalContent};
    use relayvote_state::MemoryStateStore;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    fn sample() -> GenesisState {
        let mut approved = Proposal::new(
            ProposalContent::new("usdx", Action::SetChainEra { era: 3 }),
            Height::new(10),
            40,
        )
        .unwrap();
        approved.add_voter(addr(2));
        approved.approve();

        let mut active = Proposal::new(
            ProposalContent::new("usdx", Action::SetExchangeRate { rate: 7 }),
            Height::new(12),
            40,
        )
        .unwrap();
        active.add_voter(addr(3));

        let mut proposals = vec![approved, active];
        proposals.sort_by(|a, b| a.id.as_bytes().cmp(b.id.as_bytes()));

        GenesisState {
            proposal_life: Some(40),
            admins: vec![addr(1)],
            relayers: vec![
                GenesisRelayers {
                    denom: "uatom".into(),
                    addresses: vec![addr(4)],
                },
                GenesisRelayers {
                    denom: "usdx".into(),
                    addresses: vec![addr(2), addr(3)],
                },
            ],
            thresholds: vec![
                GenesisThreshold {
                    denom: "uatom".into(),
                    value: 1,
                },
                GenesisThreshold {
                    denom: "usdx".into(),
                    value: 2,
                },
            ],
            proposals,
        }
    }

    #[test]
    fn test_export_reproduces_import() {
        let genesis = sample();
        let state = MemoryStateStore::new();

        init_genesis(&state, &genesis).unwrap();
        let exported = export_genesis(&state).unwrap();

        assert_eq!(exported, genesis);
        assert_eq!(state.version().0, 1);
        assert!(exported
            .proposals
            .iter()
            .any(|p| p.status == ProposalStatus::Approved));
    }

    #[test]
    fn test_json_roundtrip() {
        let genesis = sample();
        let json = genesis.to_json().unwrap();
        assert!(json.contains(&addr(1).to_hex()));
        assert_eq!(GenesisState::from_json(&json).unwrap(), genesis);
    }

    #[test]
    fn test_empty_genesis_omits_life() {
        let state = MemoryStateStore::new();
        init_genesis(&state, &GenesisState::from_json("{}").unwrap()).unwrap();
        assert_eq!(export_genesis(&state).unwrap(), GenesisState::default());
    }

    #[test]
    fn test_rejects_tampered_proposal() {
        let mut genesis = sample();
        genesis.proposals[0].content.denom = "other".into();
        let state = MemoryStateStore::new();

        let err = init_genesis(&state, &genesis).unwrap_err();
        assert_eq!(err.code(), "invalid_param");
        assert!(state.is_empty());
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let genesis = GenesisState::devnet(addr(1)).with_relayers("usdx", vec![addr(2)], 0);
        assert!(genesis.validate().is_err());
    }
}
