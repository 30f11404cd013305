//! Full node: runtime, height clock and API server

use crate::api::start_api_server;
use crate::runtime::NodeRuntime;
use relayvote_core::{NodeConfig, RelayVoteResult};
use relayvote_voting::GenesisState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Full RelayVote node
pub struct RelayVoteNode {
    runtime: Arc<NodeRuntime>,
    genesis: GenesisState,
}

impl RelayVoteNode {
    /// Create a new node
    pub fn new(config: NodeConfig, genesis: GenesisState) -> RelayVoteResult<Self> {
        let runtime = Arc::new(NodeRuntime::new(config)?);
        Ok(Self { runtime, genesis })
    }

    /// Run until ctrl-c
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting RelayVote node {}...", self.runtime.config().name);

        self.runtime.initialize_genesis(&self.genesis).await?;

        let clock = tokio::spawn(self.runtime.clone().run_clock());

        let api_handle = if self.runtime.config().api.enabled {
            let api_runtime = self.runtime.clone();
            let api_addr = self.runtime.config().api.listen_addr.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = start_api_server(api_runtime, &api_addr).await {
                    error!("API server error: {}", e);
                }
            }))
        } else {
            None
        };

        info!("Node started successfully");
        info!("Proposal life: {}", self.runtime.proposal_life()?.value);
        info!("State version: {}", self.runtime.state_version());

        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping node...");
            }
            Err(e) => {
                error!("Error waiting for shutdown signal: {}", e);
            }
        }

        clock.abort();
        if let Some(handle) = api_handle {
            handle.abort();
        }

        info!("Node stopped at height {}", self.runtime.height());

        Ok(())
    }

    /// Get runtime reference
    pub fn runtime(&self) -> &Arc<NodeRuntime> {
        &self.runtime
    }
}

/// Node builder for easier configuration
pub struct NodeBuilder {
    config: NodeConfig,
    genesis: GenesisState,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            config: NodeConfig::default(),
            genesis: GenesisState::default(),
        }
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn genesis(mut self, genesis: GenesisState) -> Self {
        self.genesis = genesis;
        self
    }

    pub fn api_addr(mut self, addr: &str) -> Self {
        self.config.api.listen_addr = addr.to_string();
        self
    }

    pub fn data_dir(mut self, dir: PathBuf) -> Self {
        self.config.data_dir = dir;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.config.engine.persistent = true;
        self
    }

    pub fn build(self) -> RelayVoteResult<RelayVoteNode> {
        RelayVoteNode::new(self.config, self.genesis)
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
