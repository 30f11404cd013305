//! Proposal content and the actions an approved proposal applies

use crate::traits::RelayVoteResult;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant selecting which handler applies an action
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRoute {
    Deposit,
    ChainEra,
    ExchangeRate,
}

impl ActionRoute {
    pub const ALL: [ActionRoute; 3] = [
        ActionRoute::Deposit,
        ActionRoute::ChainEra,
        ActionRoute::ExchangeRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionRoute::Deposit => "deposit",
            ActionRoute::ChainEra => "chain_era",
            ActionRoute::ExchangeRate => "exchange_rate",
        }
    }
}

impl fmt::Display for ActionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ActionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionRoute({})", self.as_str())
    }
}

/// An external-chain observation relayers vote on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Funds locked on the external chain, to be credited locally
    Deposit {
        recipient: Address,
        amount: u128,
        /// Transaction hash on the source chain
        source_tx: String,
    },
    /// The external chain advanced to a new era
    SetChainEra { era: u32 },
    /// Exchange rate observed on the external chain, scaled by 10^18
    SetExchangeRate { rate: u128 },
}

impl Action {
    pub fn route(&self) -> ActionRoute {
        match self {
            Action::Deposit { .. } => ActionRoute::Deposit,
            Action::SetChainEra { .. } => ActionRoute::ChainEra,
            Action::SetExchangeRate { .. } => ActionRoute::ExchangeRate,
        }
    }
}

/// Proposal payload: the asset key plus the action to apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContent {
    /// Asset key selecting the relayer set and threshold
    pub denom: String,
    pub action: Action,
}

impl ProposalContent {
    pub fn new(denom: impl Into<String>, action: Action) -> Self {
        Self {
            denom: denom.into(),
            action,
        }
    }

    pub fn route(&self) -> ActionRoute {
        self.action.route()
    }

    /// Canonical byte encoding, stable across processes
    pub fn canonical_bytes(&self) -> RelayVoteResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_routes() {
        let deposit = Action::Deposit {
            recipient: Address::ZERO,
            amount: 10,
            source_tx: "0xabc".into(),
        };
        assert_eq!(deposit.route(), ActionRoute::Deposit);
        assert_eq!(Action::SetChainEra { era: 3 }.route(), ActionRoute::ChainEra);
        assert_eq!(
            Action::SetExchangeRate { rate: 1 }.route(),
            ActionRoute::ExchangeRate
        );
    }

    #[test]
    fn test_canonical_bytes_distinguish_content() {
        let a = ProposalContent::new("usdx", Action::SetChainEra { era: 1 });
        let b = ProposalContent::new("usdx", Action::SetChainEra { era: 2 });
        let c = ProposalContent::new("uatom", Action::SetChainEra { era: 1 });

        let bytes = a.canonical_bytes().unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(bytes, a.clone().canonical_bytes().unwrap());
        assert_ne!(bytes, b.canonical_bytes().unwrap());
        assert_ne!(bytes, c.canonical_bytes().unwrap());
    }

    #[test]
    fn test_content_json_shape() {
        let content = ProposalContent::new("usdx", Action::SetExchangeRate { rate: 5 });
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["action"]["set_exchange_rate"]["rate"], 5);
        assert_eq!(json["denom"], "usdx");
    }
}
