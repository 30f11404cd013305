//! Error types for RelayVote

use crate::action::ActionRoute;
use thiserror::Error;

/// Main error type for RelayVote
#[derive(Error, Debug)]
pub enum RelayVoteError {
    // ============ Voting Errors ============
    #[error("Proposer is neither an admin nor a relayer for the asset")]
    NotAuthorized,

    #[error("Proposal already approved")]
    ProposalAlreadyApproved,

    #[error("Proposal already expired")]
    ProposalAlreadyExpired,

    #[error("Threshold not found for denom {0}")]
    ThresholdNotFound(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    // ============ Execution Errors ============
    #[error("No handler registered for route {0}")]
    RouteNotFound(ActionRoute),

    #[error("Execution of {route} action failed: {source}")]
    ExecutionFailed {
        route: ActionRoute,
        #[source]
        source: Box<RelayVoteError>,
    },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    // ============ Parameter Errors ============
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ============ State Errors ============
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization failed: {0}")]
    SerializationError(String),

    #[error("Deserialization failed: {0}")]
    DeserializationError(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayVoteError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            RelayVoteError::NotAuthorized => "not_authorized",
            RelayVoteError::ProposalAlreadyApproved => "already_approved",
            RelayVoteError::ProposalAlreadyExpired => "already_expired",
            RelayVoteError::ThresholdNotFound(_) => "threshold_not_found",
            RelayVoteError::ProposalNotFound(_) => "proposal_not_found",
            RelayVoteError::RouteNotFound(_) => "route_not_found",
            RelayVoteError::ExecutionFailed { .. } => "execution_failed",
            RelayVoteError::InvalidAction(_) => "invalid_action",
            RelayVoteError::InvalidParam(_) => "invalid_param",
            RelayVoteError::InvalidAddress(_) => "invalid_address",
            RelayVoteError::StorageError(_) => "storage_error",
            RelayVoteError::SerializationError(_) => "serialization_error",
            RelayVoteError::DeserializationError(_) => "deserialization_error",
            RelayVoteError::ConfigError(_) => "config_error",
            RelayVoteError::Internal(_) | RelayVoteError::Other(_) => "internal",
        }
    }

    /// Terminal-state signals: the proposal is settled, retrying will never succeed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RelayVoteError::ProposalAlreadyApproved | RelayVoteError::ProposalAlreadyExpired
        )
    }
}

impl From<std::io::Error> for RelayVoteError {
    fn from(err: std::io::Error) -> Self {
        RelayVoteError::StorageError(err.to_string())
    }
}

impl From<bincode::Error> for RelayVoteError {
    fn from(err: bincode::Error) -> Self {
        RelayVoteError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for RelayVoteError {
    fn from(err: serde_json::Error) -> Self {
        RelayVoteError::SerializationError(err.to_string())
    }
}
