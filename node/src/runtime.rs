//! Node runtime combining store, registries, engine and height clock

use parking_lot::RwLock;
use relayvote_bridge::{bridge_router, BridgeLedger};
use relayvote_core::{
    Address, Height, NodeConfig, ProposalContent, ProposalId, RelayVoteResult, StateRoot,
    StateVersion, Timestamp,
};
use relayvote_state::StateStore;
use relayvote_voting::{
    export_genesis, init_genesis, Event, GenesisState, Proposal, ProposalLifeParam,
    RegistryStore, SubmitResponse, TxContext, VoteEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::store::NodeStore;

/// Result of a state-changing call plus the events it emitted
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub value: T,
    pub height: Height,
    pub events: Vec<Event>,
}

/// Node runtime managing all components
pub struct NodeRuntime {
    config: NodeConfig,
    state: Arc<NodeStore>,
    registry: Arc<RegistryStore<NodeStore>>,
    engine: VoteEngine<NodeStore>,
    ledger: BridgeLedger<NodeStore>,
    height: RwLock<Height>,
    started_at: Timestamp,
    // Serializes every state-changing call
    writer: Mutex<()>,
}

impl NodeRuntime {
    /// Create a runtime over the store selected by `config`
    pub fn new(config: NodeConfig) -> RelayVoteResult<Self> {
        let state = if config.engine.persistent {
            let path = config.data_dir.join("state");
            info!("Opening persistent state at {}", path.display());
            NodeStore::open(path)?
        } else {
            NodeStore::memory()
        };
        Ok(Self::with_store(config, state))
    }

    pub fn with_store(config: NodeConfig, state: NodeStore) -> Self {
        let state = Arc::new(state);
        let registry = Arc::new(RegistryStore::new(state.clone()));
        let engine = VoteEngine::new(
            state.clone(),
            registry.clone(),
            registry.clone(),
            bridge_router(),
            config.engine.default_proposal_life,
        );
        let ledger = BridgeLedger::new(state.clone());

        Self {
            config,
            state,
            registry,
            engine,
            ledger,
            height: RwLock::new(Height::new(0)),
            started_at: Timestamp::now(),
            writer: Mutex::new(()),
        }
    }

    /// Load genesis into a fresh store; a store that already holds state is kept
    pub async fn initialize_genesis(&self, genesis: &GenesisState) -> RelayVoteResult<bool> {
        let _guard = self.writer.lock().await;

        if self.state.version() != StateVersion::default() {
            info!(
                "Existing state at version {}, skipping genesis",
                self.state.version()
            );
            return Ok(false);
        }

        init_genesis(self.state.as_ref(), genesis)?;
        info!("Genesis initialized, state root: {}", self.state.compute_root()?);
        Ok(true)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn height(&self) -> Height {
        *self.height.read()
    }

    /// Advance the height by one and return the new value
    pub fn advance_height(&self) -> Height {
        let mut height = self.height.write();
        *height = height.next();
        *height
    }

    /// Advance the height every `block_time_ms` until the task is dropped
    pub async fn run_clock(self: Arc<Self>) {
        let period = Duration::from_millis(self.config.engine.block_time_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            interval.tick().await;
            let height = self.advance_height();
            debug!("Height {}", height);
        }
    }

    pub fn state_version(&self) -> StateVersion {
        self.state.version()
    }

    pub fn state_root(&self) -> RelayVoteResult<StateRoot> {
        self.state.compute_root()
    }

    pub fn uptime_secs(&self) -> u64 {
        Timestamp::now().as_millis().saturating_sub(self.started_at.as_millis()) / 1000
    }

    /// Run `op` under the writer lock with a fresh context at the current height
    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut TxContext) -> RelayVoteResult<T>,
    ) -> RelayVoteResult<Applied<T>> {
        let _guard = self.writer.lock().await;
        let mut ctx = TxContext::new(self.height());
        let result = op(&mut ctx);
        // Lazy expiry writes even when the call fails
        self.state.flush()?;
        let value = result?;
        Ok(Applied {
            value,
            height: ctx.height,
            events: ctx.events.into_events(),
        })
    }

    pub async fn submit_proposal(
        &self,
        proposer: Address,
        content: ProposalContent,
    ) -> RelayVoteResult<Applied<SubmitResponse>> {
        self.apply(|ctx| self.engine.submit(ctx, &proposer, content))
            .await
    }

    pub async fn set_proposal_life(
        &self,
        admin: Address,
        value: u64,
    ) -> RelayVoteResult<Applied<ProposalLifeParam>> {
        self.apply(|ctx| self.engine.set_life(ctx, &admin, value)).await
    }

    pub async fn add_admin(&self, caller: Address, address: Address) -> RelayVoteResult<Applied<()>> {
        self.apply(|ctx| self.registry.add_admin(ctx, &caller, &address))
            .await
    }

    pub async fn add_relayer(
        &self,
        caller: Address,
        denom: String,
        address: Address,
    ) -> RelayVoteResult<Applied<()>> {
        self.apply(|ctx| self.registry.add_relayer(ctx, &caller, &denom, &address))
            .await
    }

    pub async fn remove_relayer(
        &self,
        caller: Address,
        denom: String,
        address: Address,
    ) -> RelayVoteResult<Applied<()>> {
        self.apply(|ctx| self.registry.remove_relayer(ctx, &caller, &denom, &address))
            .await
    }

    pub async fn set_threshold(
        &self,
        caller: Address,
        denom: String,
        value: u32,
    ) -> RelayVoteResult<Applied<()>> {
        self.apply(|ctx| self.registry.set_threshold(ctx, &caller, &denom, value))
            .await
    }

    pub fn proposal(&self, id: &ProposalId) -> RelayVoteResult<Proposal> {
        self.engine.proposal(id)
    }

    pub fn proposals(&self) -> RelayVoteResult<Vec<Proposal>> {
        self.engine.proposals()
    }

    pub fn proposal_life(&self) -> RelayVoteResult<ProposalLifeParam> {
        self.engine.proposal_life()
    }

    /// Whether `proposal` would be found expired on its next touch
    pub fn is_expired(&self, proposal: &Proposal) -> bool {
        self.engine.is_expired(proposal, self.height())
    }

    pub fn relayers(&self, denom: &str) -> RelayVoteResult<Vec<Address>> {
        self.registry.relayers(denom)
    }

    pub fn threshold(&self, denom: &str) -> RelayVoteResult<Option<u32>> {
        relayvote_core::RelayerRegistry::threshold(self.registry.as_ref(), denom)
    }

    pub fn ledger(&self) -> &BridgeLedger<NodeStore> {
        &self.ledger
    }

    pub fn export_genesis(&self) -> RelayVoteResult<GenesisState> {
        export_genesis(self.state.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayvote_core::{Action, RelayVoteError};
    use relayvote_voting::ProposalStatus;
    use tempfile::TempDir;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    fn genesis() -> GenesisState {
        GenesisState::devnet(addr(0xAA)).with_relayers("usdx", vec![addr(1), addr(2)], 2)
    }

    fn deposit() -> ProposalContent {
        ProposalContent::new(
            "usdx",
            Action::Deposit {
                recipient: addr(7),
                amount: 250,
                source_tx: "0xabc".into(),
            },
        )
    }

    async fn runtime() -> NodeRuntime {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        assert!(runtime.initialize_genesis(&genesis()).await.unwrap());
        runtime
    }

    #[tokio::test]
    async fn test_deposit_reaches_quorum() {
        let runtime = runtime().await;

        let first = runtime.submit_proposal(addr(1), deposit()).await.unwrap();
        assert_eq!(first.value.status, ProposalStatus::Active);
        assert_eq!(runtime.ledger().balance("usdx", &addr(7)).unwrap(), 0);

        runtime.advance_height();
        let second = runtime.submit_proposal(addr(2), deposit()).await.unwrap();
        assert_eq!(second.value.status, ProposalStatus::Approved);
        assert_eq!(second.height, Height::new(1));
        assert!(second.events.iter().any(|e| e.kind == "deposit"));
        assert_eq!(runtime.ledger().balance("usdx", &addr(7)).unwrap(), 250);
    }

    #[tokio::test]
    async fn test_genesis_skipped_on_populated_store() {
        let runtime = runtime().await;
        assert!(!runtime.initialize_genesis(&GenesisState::default()).await.unwrap());
        assert_eq!(runtime.relayers("usdx").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expiry_follows_clock() {
        let runtime = runtime().await;
        runtime.set_proposal_life(addr(0xAA), 2).await.unwrap();

        let id = runtime
            .submit_proposal(addr(1), deposit())
            .await
            .unwrap()
            .value
            .proposal_id;
        for _ in 0..3 {
            runtime.advance_height();
        }
        assert!(runtime.is_expired(&runtime.proposal(&id).unwrap()));

        let err = runtime.submit_proposal(addr(2), deposit()).await.unwrap_err();
        assert!(matches!(err, RelayVoteError::ProposalAlreadyExpired));
    }

    #[tokio::test]
    async fn test_registry_updates_through_runtime() {
        let runtime = runtime().await;

        let err = runtime
            .set_threshold(addr(1), "usdx".into(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayVoteError::NotAuthorized));

        runtime
            .add_relayer(addr(0xAA), "uatom".into(), addr(3))
            .await
            .unwrap();
        runtime
            .set_threshold(addr(0xAA), "uatom".into(), 1)
            .await
            .unwrap();
        assert_eq!(runtime.threshold("uatom").unwrap(), Some(1));

        let exported = runtime.export_genesis().unwrap();
        assert_eq!(exported.relayers.len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_state_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let mut config = NodeConfig::default();
        config.data_dir = tmp.path().to_path_buf();
        config.engine.persistent = true;

        {
            let runtime = NodeRuntime::new(config.clone()).unwrap();
            runtime.initialize_genesis(&genesis()).await.unwrap();
            runtime.submit_proposal(addr(1), deposit()).await.unwrap();
        }

        let runtime = NodeRuntime::new(config).unwrap();
        assert!(!runtime.initialize_genesis(&genesis()).await.unwrap());
        let proposals = runtime.proposals().unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].vote_count(), 1);
    }
}
