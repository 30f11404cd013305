//! CLI Commands

use relayvote_core::{Action, Address};
use relayvote_crypto::keys::KeyFile;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// API Client for interacting with a RelayVote node
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp: ApiResponse<T> = self.client.get(self.url(path)).send().await?.json().await?;
        resp.into_result()
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp: ApiResponse<T> = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        resp.into_result()
    }

    /// Get node status
    pub async fn status(&self) -> Result<NodeStatus, ApiError> {
        self.get("/status").await
    }

    pub async fn submit_proposal(
        &self,
        proposer: &Address,
        denom: &str,
        action: Action,
    ) -> Result<SubmitResult, ApiError> {
        let body = serde_json::json!({
            "proposer": proposer.to_hex(),
            "denom": denom,
            "action": action,
        });
        self.post("/proposals", &body).await
    }

    pub async fn proposal(&self, id: &str) -> Result<ProposalInfo, ApiError> {
        self.get(&format!("/proposals/{}", id)).await
    }

    pub async fn proposals(&self) -> Result<Vec<ProposalInfo>, ApiError> {
        self.get("/proposals").await
    }

    pub async fn proposal_life(&self) -> Result<ProposalLife, ApiError> {
        self.get("/params/proposal-life").await
    }

    pub async fn set_proposal_life(
        &self,
        admin: &Address,
        value: u64,
    ) -> Result<ProposalLife, ApiError> {
        let body = serde_json::json!({ "admin": admin.to_hex(), "value": value });
        self.post("/params/proposal-life", &body).await
    }

    pub async fn update_relayer(
        &self,
        admin: &Address,
        denom: &str,
        address: &Address,
        remove: bool,
    ) -> Result<UpdateResult, ApiError> {
        let body = serde_json::json!({
            "admin": admin.to_hex(),
            "denom": denom,
            "address": address.to_hex(),
            "remove": remove,
        });
        self.post("/relayers", &body).await
    }

    pub async fn relayers(&self, denom: &str) -> Result<RelayerSet, ApiError> {
        self.get(&format!("/relayers/{}", denom)).await
    }

    pub async fn set_threshold(
        &self,
        admin: &Address,
        denom: &str,
        value: u32,
    ) -> Result<UpdateResult, ApiError> {
        let body = serde_json::json!({ "admin": admin.to_hex(), "denom": denom, "value": value });
        self.post("/thresholds", &body).await
    }

    pub async fn balance(&self, denom: &str, address: &Address) -> Result<BalanceInfo, ApiError> {
        self.get(&format!("/balances/{}/{}", denom, address.to_hex()))
            .await
    }
}

/// API response wrapper
#[derive(Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, ApiError> {
        if self.success {
            self.data.ok_or(ApiError::EmptyResponse)
        } else {
            Err(ApiError::Server {
                code: self.code.unwrap_or_else(|| "unknown".into()),
                message: self.error.unwrap_or_default(),
            })
        }
    }
}

/// Node status
#[derive(Debug, Deserialize)]
pub struct NodeStatus {
    pub name: String,
    pub height: u64,
    pub state_version: u64,
    pub state_root: String,
    pub proposal_life: u64,
    pub persistent: bool,
    pub uptime_secs: u64,
}

/// Emitted event
#[derive(Debug, Deserialize)]
pub struct EventInfo {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

/// Submit-proposal result
#[derive(Debug, Deserialize)]
pub struct SubmitResult {
    pub proposal_id: String,
    pub status: String,
    pub height: u64,
    pub events: Vec<EventInfo>,
}

/// Proposal as reported by the node
#[derive(Debug, Deserialize)]
pub struct ProposalInfo {
    pub id: String,
    pub denom: String,
    pub route: String,
    pub action: Action,
    pub status: String,
    pub voters: Vec<String>,
    pub created_at: u64,
    pub life: u64,
    pub expire_height: u64,
    pub expired: bool,
}

/// Proposal life parameter
#[derive(Debug, Deserialize)]
pub struct ProposalLife {
    pub value: u64,
    pub version: u64,
}

/// Admin update result
#[derive(Debug, Deserialize)]
pub struct UpdateResult {
    pub height: u64,
    pub events: Vec<EventInfo>,
}

/// Relayer set of a denom
#[derive(Debug, Deserialize)]
pub struct RelayerSet {
    pub denom: String,
    pub threshold: Option<u32>,
    pub relayers: Vec<String>,
}

/// Balance info
#[derive(Debug, Deserialize)]
pub struct BalanceInfo {
    pub denom: String,
    pub address: String,
    pub balance: String,
}

/// API Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error [{code}]: {message}")]
    Server { code: String, message: String },

    #[error("Empty response")]
    EmptyResponse,
}

impl ApiError {
    /// Stable error kind reported by the node, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Server { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Resolve `--from`: a key file path, or a hex address
pub fn resolve_principal(from: &str) -> anyhow::Result<Address> {
    let path = Path::new(from);
    if path.is_file() {
        let key_file = KeyFile::load(path)?;
        return Ok(key_file.to_keypair()?.address());
    }
    Address::from_hex(from).map_err(|e| anyhow::anyhow!("invalid principal {}: {}", from, e))
}

/// Parse a decimal `u128`, the width deposits and rates use
pub fn parse_amount(s: &str) -> anyhow::Result<u128> {
    s.replace('_', "")
        .parse::<u128>()
        .map_err(|e| anyhow::anyhow!("invalid amount {}: {}", s, e))
}

/// Shorten long hex strings for tables
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}

/// One-line JSON rendering of an action, falling back to `Debug`
pub fn describe_action(action: &Action) -> String {
    serde_json::to_string(action).unwrap_or_else(|_| format!("{:?}", action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayvote_crypto::keys::KeyPair;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_principal_from_hex_and_key_file() {
        let keypair = KeyPair::generate();
        let address = keypair.address();

        assert_eq!(resolve_principal(&address.to_hex()).unwrap(), address);
        assert_eq!(
            resolve_principal(&format!("0x{}", address.to_hex())).unwrap(),
            address
        );

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("relayer.json");
        KeyFile::from(&keypair).save(&path).unwrap();
        assert_eq!(resolve_principal(path.to_str().unwrap()).unwrap(), address);

        assert!(resolve_principal("not-an-address").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1_000_000").unwrap(), 1_000_000);
        assert_eq!(
            parse_amount("1050000000000000000").unwrap(),
            1_050_000_000_000_000_000
        );
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn test_server_error_keeps_code() {
        let resp: ApiResponse<ProposalLife> = serde_json::from_str(
            r#"{"success":false,"data":null,"error":"Not authorized","code":"not_authorized"}"#,
        )
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code(), Some("not_authorized"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 4), "abcd...");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn test_describe_action_shows_fields() {
        let rendered = describe_action(&Action::SetChainEra { era: 9 });
        assert!(!rendered.is_empty());
        assert!(rendered.contains("9"));
        assert_eq!(
            serde_json::from_str::<Action>(&rendered).unwrap(),
            Action::SetChainEra { era: 9 }
        );
    }
}
