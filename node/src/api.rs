//! HTTP API for the RelayVote node

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use relayvote_core::{Action, Address, Hash, ProposalContent, RelayVoteError};
use relayvote_voting::{Event, Proposal, ProposalStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::runtime::{Applied, NodeRuntime};

/// API state containing node runtime
pub type ApiState = Arc<NodeRuntime>;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Stable error kind, see `RelayVoteError::code`
    pub code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn err(error: &RelayVoteError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            code: Some(error.code().to_string()),
        }
    }
}

/// HTTP status for an engine error
pub fn status_for(error: &RelayVoteError) -> StatusCode {
    match error {
        RelayVoteError::NotAuthorized => StatusCode::FORBIDDEN,
        RelayVoteError::ProposalAlreadyApproved | RelayVoteError::ProposalAlreadyExpired => {
            StatusCode::CONFLICT
        }
        RelayVoteError::ThresholdNotFound(_) | RelayVoteError::ProposalNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        RelayVoteError::RouteNotFound(_) | RelayVoteError::ExecutionFailed { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RelayVoteError::InvalidAction(_)
        | RelayVoteError::InvalidParam(_)
        | RelayVoteError::InvalidAddress(_)
        | RelayVoteError::DeserializationError(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply<T: Serialize>(result: Result<T, RelayVoteError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!("Request failed: {}", e);
            }
            (status, Json(ApiResponse::<T>::err(&e))).into_response()
        }
    }
}

fn parse_address(s: &str) -> Result<Address, RelayVoteError> {
    Address::from_hex(s).map_err(|e| RelayVoteError::InvalidAddress(format!("{}: {}", s, e)))
}

fn parse_id(s: &str) -> Result<Hash, RelayVoteError> {
    Hash::from_hex(s).map_err(|e| RelayVoteError::InvalidParam(format!("proposal id {}: {}", s, e)))
}

/// Node status response
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub name: String,
    pub height: u64,
    pub state_version: u64,
    pub state_root: String,
    pub proposal_life: u64,
    pub persistent: bool,
    pub uptime_secs: u64,
}

/// Proposal view with its expiry resolved against the current height
#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub id: String,
    pub denom: String,
    pub route: String,
    pub action: Action,
    pub status: ProposalStatus,
    pub voters: Vec<String>,
    pub created_at: u64,
    pub life: u64,
    pub expire_height: u64,
    /// Still `active` in the store but past its life
    pub expired: bool,
}

impl ProposalResponse {
    fn new(proposal: Proposal, expired: bool) -> Self {
        Self {
            id: proposal.id.to_hex(),
            denom: proposal.content.denom.clone(),
            route: proposal.content.route().to_string(),
            status: proposal.status,
            voters: proposal.voters.iter().map(|v| v.to_hex()).collect(),
            created_at: proposal.created_at.0,
            life: proposal.life,
            expire_height: proposal.expire_height().0,
            expired,
            action: proposal.content.action,
        }
    }
}

/// Submit-proposal request
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitProposalRequest {
    pub proposer: String,
    pub denom: String,
    pub action: Action,
}

/// Submit-proposal response
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitProposalResponse {
    pub proposal_id: String,
    pub status: ProposalStatus,
    pub height: u64,
    pub events: Vec<Event>,
}

/// Proposal life update
#[derive(Debug, Serialize, Deserialize)]
pub struct SetProposalLifeRequest {
    pub admin: String,
    pub value: u64,
}

/// Current proposal life
#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalLifeResponse {
    pub value: u64,
    pub version: u64,
}

/// Relayer set change
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayerRequest {
    pub admin: String,
    pub denom: String,
    pub address: String,
    #[serde(default)]
    pub remove: bool,
}

/// Threshold change
#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdRequest {
    pub admin: String,
    pub denom: String,
    pub value: u32,
}

/// Events emitted by an admin call
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub height: u64,
    pub events: Vec<Event>,
}

impl From<Applied<()>> for UpdateResponse {
    fn from(applied: Applied<()>) -> Self {
        Self {
            height: applied.height.0,
            events: applied.events,
        }
    }
}

/// Relayer set of a denom
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayersResponse {
    pub denom: String,
    pub threshold: Option<u32>,
    pub relayers: Vec<String>,
}

/// Balance response
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub denom: String,
    pub address: String,
    pub balance: String,
}

/// Bridge parameters of a denom
#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub denom: String,
    pub era: Option<u32>,
    pub exchange_rate: Option<String>,
}

/// Create API router
pub fn create_router(state: ApiState) -> Router {
    let enable_cors = state.config().api.enable_cors;

    let router = Router::new()
        // Health
        .route("/health", get(health))
        .route("/status", get(status))
        // Proposals
        .route("/proposals", get(list_proposals).post(submit_proposal))
        .route("/proposals/:id", get(get_proposal))
        .route(
            "/params/proposal-life",
            get(get_proposal_life).post(set_proposal_life),
        )
        // Registry
        .route("/relayers", post(update_relayer))
        .route("/relayers/:denom", get(get_relayers))
        .route("/thresholds", post(set_threshold))
        // Bridge
        .route("/balances/:denom/:address", get(get_balance))
        .route("/bridge/:denom", get(get_bridge))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Node status
async fn status(State(runtime): State<ApiState>) -> Response {
    reply(node_status(&runtime))
}

fn node_status(runtime: &NodeRuntime) -> Result<NodeStatusResponse, RelayVoteError> {
    Ok(NodeStatusResponse {
        name: runtime.config().name.clone(),
        height: runtime.height().0,
        state_version: runtime.state_version().0,
        state_root: runtime.state_root()?.to_hex(),
        proposal_life: runtime.proposal_life()?.value,
        persistent: runtime.config().engine.persistent,
        uptime_secs: runtime.uptime_secs(),
    })
}

async fn list_proposals(State(runtime): State<ApiState>) -> Response {
    reply(runtime.proposals().map(|proposals| {
        proposals
            .into_iter()
            .map(|p| {
                let expired = runtime.is_expired(&p);
                ProposalResponse::new(p, expired)
            })
            .collect::<Vec<_>>()
    }))
}

async fn get_proposal(State(runtime): State<ApiState>, Path(id): Path<String>) -> Response {
    reply(parse_id(&id).and_then(|id| runtime.proposal(&id)).map(|p| {
        let expired = runtime.is_expired(&p);
        ProposalResponse::new(p, expired)
    }))
}

async fn submit_proposal(
    State(runtime): State<ApiState>,
    Json(req): Json<SubmitProposalRequest>,
) -> Response {
    let proposer = match parse_address(&req.proposer) {
        Ok(proposer) => proposer,
        Err(e) => return reply::<SubmitProposalResponse>(Err(e)),
    };
    let content = ProposalContent::new(req.denom, req.action);

    let result = runtime.submit_proposal(proposer, content).await;
    if let Ok(applied) = &result {
        info!(
            "Proposal {} from {} is {}",
            applied.value.proposal_id, proposer, applied.value.status
        );
    }
    reply(result.map(|applied| SubmitProposalResponse {
        proposal_id: applied.value.proposal_id.to_hex(),
        status: applied.value.status,
        height: applied.height.0,
        events: applied.events,
    }))
}

async fn get_proposal_life(State(runtime): State<ApiState>) -> Response {
    reply(runtime.proposal_life().map(|param| ProposalLifeResponse {
        value: param.value,
        version: param.version,
    }))
}

async fn set_proposal_life(
    State(runtime): State<ApiState>,
    Json(req): Json<SetProposalLifeRequest>,
) -> Response {
    let admin = match parse_address(&req.admin) {
        Ok(admin) => admin,
        Err(e) => return reply::<ProposalLifeResponse>(Err(e)),
    };
    reply(
        runtime
            .set_proposal_life(admin, req.value)
            .await
            .map(|applied| ProposalLifeResponse {
                value: applied.value.value,
                version: applied.value.version,
            }),
    )
}

async fn update_relayer(
    State(runtime): State<ApiState>,
    Json(req): Json<RelayerRequest>,
) -> Response {
    let (admin, address) = match (parse_address(&req.admin), parse_address(&req.address)) {
        (Ok(admin), Ok(address)) => (admin, address),
        (Err(e), _) | (_, Err(e)) => return reply::<UpdateResponse>(Err(e)),
    };
    let result = if req.remove {
        runtime.remove_relayer(admin, req.denom, address).await
    } else {
        runtime.add_relayer(admin, req.denom, address).await
    };
    reply(result.map(UpdateResponse::from))
}

async fn get_relayers(State(runtime): State<ApiState>, Path(denom): Path<String>) -> Response {
    reply(relayer_set(&runtime, denom))
}

fn relayer_set(runtime: &NodeRuntime, denom: String) -> Result<RelayersResponse, RelayVoteError> {
    Ok(RelayersResponse {
        threshold: runtime.threshold(&denom)?,
        relayers: runtime
            .relayers(&denom)?
            .iter()
            .map(|a| a.to_hex())
            .collect(),
        denom,
    })
}

async fn set_threshold(
    State(runtime): State<ApiState>,
    Json(req): Json<ThresholdRequest>,
) -> Response {
    let admin = match parse_address(&req.admin) {
        Ok(admin) => admin,
        Err(e) => return reply::<UpdateResponse>(Err(e)),
    };
    reply(
        runtime
            .set_threshold(admin, req.denom, req.value)
            .await
            .map(UpdateResponse::from),
    )
}

async fn get_balance(
    State(runtime): State<ApiState>,
    Path((denom, address)): Path<(String, String)>,
) -> Response {
    reply(parse_address(&address).and_then(|address| {
        let balance = runtime.ledger().balance(&denom, &address)?;
        Ok(BalanceResponse {
            denom: denom.clone(),
            address: address.to_hex(),
            balance: balance.to_string(),
        })
    }))
}

async fn get_bridge(State(runtime): State<ApiState>, Path(denom): Path<String>) -> Response {
    reply(bridge_params(&runtime, denom))
}

fn bridge_params(runtime: &NodeRuntime, denom: String) -> Result<BridgeResponse, RelayVoteError> {
    Ok(BridgeResponse {
        era: runtime.ledger().chain_era(&denom)?,
        exchange_rate: runtime
            .ledger()
            .exchange_rate(&denom)?
            .map(|rate| rate.to_string()),
        denom,
    })
}

/// Start API server
pub async fn start_api_server(runtime: Arc<NodeRuntime>, listen_addr: &str) -> anyhow::Result<()> {
    let router = create_router(runtime);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("API server listening on {}", listen_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
