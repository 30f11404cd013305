//! Voting aggregator
//!
//! Every call re-reads what it needs from the store and either applies fully
//! or leaves the store untouched. The single exception is lazy expiry, which
//! persists the `Expired` record before failing.

use relayvote_core::{
    Address, AdminRegistry, Height, ProposalContent, ProposalId, RelayVoteError,
    RelayVoteResult, RelayerRegistry,
};
use relayvote_state::StateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatcher::dispatch;
use crate::events::{
    Event, TxContext, EVENT_PROPOSAL_EXPIRED, EVENT_SET_PROPOSAL_LIFE, EVENT_SUBMIT_PROPOSAL,
};
use crate::lifecycle::{self, ProposalLifeParam};
use crate::proposal::{Proposal, ProposalStatus, ProposalStore};
use crate::router::Router;

/// Summary returned to the submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub proposal_id: ProposalId,
    pub status: ProposalStatus,
}

/// Threshold voting engine over a replicated store
pub struct VoteEngine<S: StateStore> {
    state: Arc<S>,
    admins: Arc<dyn AdminRegistry>,
    relayers: Arc<dyn RelayerRegistry>,
    router: Router,
    /// Proposal life used until one is stored
    default_life: u64,
}

impl<S: StateStore> VoteEngine<S> {
    pub fn new(
        state: Arc<S>,
        admins: Arc<dyn AdminRegistry>,
        relayers: Arc<dyn RelayerRegistry>,
        router: Router,
        default_life: u64,
    ) -> Self {
        Self {
            state,
            admins,
            relayers,
            router,
            default_life,
        }
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Record `proposer`'s vote for `content`, executing the action once
    /// quorum is reached or an admin submits.
    pub fn submit(
        &self,
        ctx: &mut TxContext,
        proposer: &Address,
        content: ProposalContent,
    ) -> RelayVoteResult<SubmitResponse> {
        let is_admin = self.admins.is_admin(proposer)?;
        if !is_admin && !self.relayers.is_relayer(&content.denom, proposer)? {
            return Err(RelayVoteError::NotAuthorized);
        }

        let id = crate::identity::identify(&content)?;
        let mut proposal = match ProposalStore::get(self.state.as_ref(), &id)? {
            Some(existing) => existing,
            None => {
                let life = lifecycle::proposal_life(self.state.as_ref(), self.default_life)?;
                info!(
                    "New proposal {} for {} ({}) at height {}",
                    id,
                    content.denom,
                    content.route(),
                    ctx.height
                );
                Proposal::new(content, ctx.height, life.value)?
            }
        };

        match proposal.status {
            ProposalStatus::Approved => return Err(RelayVoteError::ProposalAlreadyApproved),
            ProposalStatus::Expired => return Err(RelayVoteError::ProposalAlreadyExpired),
            ProposalStatus::Active => {}
        }

        if proposal.is_expired(ctx.height) {
            proposal.expire();
            ProposalStore::set(self.state.as_ref(), &proposal)?;

            info!(
                "Proposal {} expired at height {} (created {}, life {})",
                proposal.id, ctx.height, proposal.created_at, proposal.life
            );
            ctx.emit(
                Event::new(EVENT_PROPOSAL_EXPIRED)
                    .attr("proposal_id", proposal.id)
                    .attr("height", ctx.height),
            );
            return Err(RelayVoteError::ProposalAlreadyExpired);
        }

        let threshold = self
            .relayers
            .threshold(&proposal.content.denom)?
            .ok_or_else(|| RelayVoteError::ThresholdNotFound(proposal.content.denom.clone()))?;

        if !proposal.add_voter(*proposer) {
            debug!("Repeated vote from {} on {}", proposer, proposal.id);
        }
        debug!(
            "Proposal {} has {}/{} votes",
            proposal.id,
            proposal.vote_count(),
            threshold
        );

        let approved = is_admin || proposal.vote_count() >= threshold as usize;
        if !approved {
            ProposalStore::set(self.state.as_ref(), &proposal)?;
            ctx.emit(submit_event(&proposal, proposer));
            return Ok(SubmitResponse {
                proposal_id: proposal.id,
                status: proposal.status,
            });
        }

        let execution = dispatch(
            &self.router,
            self.state.as_ref(),
            ctx.height,
            &proposal.content,
        )?;

        proposal.approve();
        let mut changes = execution.changes;
        changes.push(ProposalStore::change(&proposal)?);
        self.state.apply_batch(changes)?;

        if is_admin {
            info!("Proposal {} approved by admin {}", proposal.id, proposer);
        } else {
            info!(
                "Proposal {} approved with {} votes",
                proposal.id,
                proposal.vote_count()
            );
        }

        ctx.emit(submit_event(&proposal, proposer));
        ctx.events.merge(execution.events);

        Ok(SubmitResponse {
            proposal_id: proposal.id,
            status: proposal.status,
        })
    }

    /// Change the proposal life; admin only
    pub fn set_life(
        &self,
        ctx: &mut TxContext,
        admin: &Address,
        value: u64,
    ) -> RelayVoteResult<ProposalLifeParam> {
        if !self.admins.is_admin(admin)? {
            return Err(RelayVoteError::NotAuthorized);
        }

        let param = lifecycle::store_proposal_life(self.state.as_ref(), value, self.default_life)?;

        info!(
            "Proposal life set to {} (version {}) by {}",
            param.value, param.version, admin
        );
        ctx.emit(
            Event::new(EVENT_SET_PROPOSAL_LIFE)
                .attr("value", param.value)
                .attr("version", param.version),
        );
        Ok(param)
    }

    pub fn proposal(&self, id: &ProposalId) -> RelayVoteResult<Proposal> {
        ProposalStore::get(self.state.as_ref(), id)?
            .ok_or_else(|| RelayVoteError::ProposalNotFound(id.to_hex()))
    }

    pub fn proposals(&self) -> RelayVoteResult<Vec<Proposal>> {
        ProposalStore::all(self.state.as_ref())
    }

    pub fn proposal_life(&self) -> RelayVoteResult<ProposalLifeParam> {
        lifecycle::proposal_life(self.state.as_ref(), self.default_life)
    }

    /// Whether `proposal` is past its life at `height`; reads nothing
    pub fn is_expired(&self, proposal: &Proposal, height: Height) -> bool {
        lifecycle::is_expired(proposal, height)
    }
}

fn submit_event(proposal: &Proposal, proposer: &Address) -> Event {
    Event::new(EVENT_SUBMIT_PROPOSAL)
        .attr("proposal_id", proposal.id)
        .attr("proposer", proposer)
        .attr("denom", &proposal.content.denom)
        .attr("status", proposal.status)
        .attr("votes", proposal.vote_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{put_admin, put_relayer, put_threshold, RegistryStore};
    use crate::router::{ActionHandler, ExecutionScope};
    use relayvote_core::{Action, ActionRoute, StateMutator, StateProvider};
    use relayvote_state::MemoryStateStore;

    const ERA_EVENT: &str = "era_updated";

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    fn admin() -> Address {
        addr(0xAA)
    }

    fn era_key(denom: &str) -> Vec<u8> {
        format!("era:{}", denom).into_bytes()
    }

    /// Stores the era; era 0 is rejected
    struct EraRecorder;

    impl ActionHandler for EraRecorder {
        fn route(&self) -> ActionRoute {
            ActionRoute::ChainEra
        }

        fn handle(
            &self,
            scope: &mut ExecutionScope<'_>,
            denom: &str,
            action: &Action,
        ) -> RelayVoteResult<()> {
            let Action::SetChainEra { era } = action else {
                return Err(RelayVoteError::InvalidAction("expected era".into()));
            };
            if *era == 0 {
                return Err(RelayVoteError::InvalidAction("era 0".into()));
            }
            scope.store.set(&era_key(denom), &era.to_be_bytes())?;
            scope.emit(Event::new(ERA_EVENT).attr("denom", denom).attr("era", era));
            Ok(())
        }
    }

    fn setup(threshold: u32) -> (VoteEngine<MemoryStateStore>, Arc<MemoryStateStore>) {
        let state = Arc::new(MemoryStateStore::new());
        put_admin(state.as_ref(), &admin()).unwrap();
        for relayer in [addr(1), addr(2), addr(3)] {
            put_relayer(state.as_ref(), "usdx", &relayer).unwrap();
        }
        put_threshold(state.as_ref(), "usdx", threshold).unwrap();
        lifecycle::store_proposal_life(state.as_ref(), 50, 600).unwrap();

        let registry = Arc::new(RegistryStore::new(state.clone()));
        let engine = VoteEngine::new(
            state.clone(),
            registry.clone(),
            registry,
            Router::new().with_handler(Arc::new(EraRecorder)),
            600,
        );
        (engine, state)
    }

    fn era(era: u32) -> ProposalContent {
        ProposalContent::new("usdx", Action::SetChainEra { era })
    }

    fn submit_at(
        engine: &VoteEngine<MemoryStateStore>,
        height: u64,
        who: Address,
        content: ProposalContent,
    ) -> RelayVoteResult<SubmitResponse> {
        let mut ctx = TxContext::new(Height::new(height));
        engine.submit(&mut ctx, &who, content)
    }

    #[test]
    fn test_example_scenario() {
        let (engine, state) = setup(2);

        let first = submit_at(&engine, 100, addr(1), era(7)).unwrap();
        assert_eq!(first.status, ProposalStatus::Active);
        let record = engine.proposal(&first.proposal_id).unwrap();
        assert_eq!(record.voters.iter().copied().collect::<Vec<_>>(), vec![addr(1)]);
        assert_eq!(record.created_at, Height::new(100));
        assert_eq!(record.life, 50);
        assert!(state.get(&era_key("usdx")).unwrap().is_none());

        let second = submit_at(&engine, 120, addr(2), era(7)).unwrap();
        assert_eq!(second.proposal_id, first.proposal_id);
        assert_eq!(second.status, ProposalStatus::Approved);
        assert_eq!(
            state.get(&era_key("usdx")).unwrap(),
            Some(7u32.to_be_bytes().to_vec())
        );

        let before = engine.proposal(&first.proposal_id).unwrap();
        let version = state.version();
        let err = submit_at(&engine, 200, addr(3), era(7)).unwrap_err();
        assert!(matches!(err, RelayVoteError::ProposalAlreadyApproved));
        assert!(err.is_terminal());
        assert_eq!(engine.proposal(&first.proposal_id).unwrap(), before);
        assert_eq!(state.version(), version);
    }

    #[test]
    fn test_idempotent_vote() {
        let (engine, _) = setup(3);

        let id = submit_at(&engine, 10, addr(1), era(1)).unwrap().proposal_id;
        let again = submit_at(&engine, 11, addr(1), era(1)).unwrap();

        assert_eq!(again.status, ProposalStatus::Active);
        assert_eq!(engine.proposal(&id).unwrap().vote_count(), 1);
    }

    #[test]
    fn test_quorum_on_exactly_threshold_th_vote() {
        let (engine, state) = setup(3);

        assert_eq!(
            submit_at(&engine, 10, addr(1), era(4)).unwrap().status,
            ProposalStatus::Active
        );
        assert_eq!(
            submit_at(&engine, 11, addr(2), era(4)).unwrap().status,
            ProposalStatus::Active
        );
        assert!(state.get(&era_key("usdx")).unwrap().is_none());
        assert_eq!(
            submit_at(&engine, 12, addr(3), era(4)).unwrap().status,
            ProposalStatus::Approved
        );
        assert!(state.get(&era_key("usdx")).unwrap().is_some());
    }

    #[test]
    fn test_admin_override_without_prior_votes() {
        let (engine, state) = setup(3);

        let response = submit_at(&engine, 10, admin(), era(9)).unwrap();

        assert_eq!(response.status, ProposalStatus::Approved);
        let record = engine.proposal(&response.proposal_id).unwrap();
        assert_eq!(record.voters.len(), 1);
        assert!(state.get(&era_key("usdx")).unwrap().is_some());
    }

    #[test]
    fn test_admin_still_needs_threshold() {
        let (engine, _) = setup(2);
        // Admin standing is global, so other denoms accept it too; they still
        // need a threshold
        let err = submit_at(
            &engine,
            10,
            admin(),
            ProposalContent::new("uatom", Action::SetChainEra { era: 1 }),
        )
        .unwrap_err();
        assert!(matches!(err, RelayVoteError::ThresholdNotFound(d) if d == "uatom"));
    }

    #[test]
    fn test_not_authorized() {
        let (engine, state) = setup(2);
        let version = state.version();
        let len = state.len();

        let err = submit_at(&engine, 10, addr(9), era(1)).unwrap_err();
        assert!(matches!(err, RelayVoteError::NotAuthorized));

        // Relayer for usdx only
        let err = submit_at(
            &engine,
            10,
            addr(1),
            ProposalContent::new("uatom", Action::SetChainEra { era: 1 }),
        )
        .unwrap_err();
        assert!(matches!(err, RelayVoteError::NotAuthorized));

        assert_eq!(state.version(), version);
        assert_eq!(state.len(), len);
    }

    #[test]
    fn test_threshold_not_found() {
        let (engine, state) = setup(2);
        put_relayer(state.as_ref(), "ueth", &addr(1)).unwrap();
        let len = state.len();

        let err = submit_at(
            &engine,
            10,
            addr(1),
            ProposalContent::new("ueth", Action::SetChainEra { era: 1 }),
        )
        .unwrap_err();
        assert_eq!(err.code(), "threshold_not_found");
        assert_eq!(state.len(), len);
    }

    #[test]
    fn test_failed_execution_leaves_record_unchanged() {
        let (engine, state) = setup(2);

        let id = submit_at(&engine, 10, addr(1), era(0)).unwrap().proposal_id;
        let before = engine.proposal(&id).unwrap();
        let entries_before = state.all_entries().unwrap();

        let err = submit_at(&engine, 11, addr(2), era(0)).unwrap_err();
        assert_eq!(err.code(), "execution_failed");
        assert!(!err.is_terminal());

        assert_eq!(engine.proposal(&id).unwrap(), before);
        assert_eq!(state.all_entries().unwrap(), entries_before);

        // Still retryable: the failure did not freeze the record
        assert!(submit_at(&engine, 12, addr(2), era(0)).is_err());
        assert_eq!(engine.proposal(&id).unwrap().status, ProposalStatus::Active);
    }

    #[test]
    fn test_failed_execution_on_first_vote_persists_nothing() {
        let (engine, state) = setup(1);
        let id = crate::identity::identify(&era(0)).unwrap();

        assert!(submit_at(&engine, 10, addr(1), era(0)).is_err());
        assert!(ProposalStore::get(state.as_ref(), &id).unwrap().is_none());
    }

    #[test]
    fn test_route_not_found_is_atomic() {
        let (engine, state) = setup(1);
        let content = ProposalContent::new("usdx", Action::SetExchangeRate { rate: 5 });
        let id = crate::identity::identify(&content).unwrap();

        let err = submit_at(&engine, 10, addr(1), content).unwrap_err();
        assert!(matches!(err, RelayVoteError::RouteNotFound(ActionRoute::ExchangeRate)));
        assert!(ProposalStore::get(state.as_ref(), &id).unwrap().is_none());
    }

    #[test]
    fn test_unrouted_quorum_keeps_store_then_expires() {
        let (engine, state) = setup(2);
        let content = ProposalContent::new("usdx", Action::SetExchangeRate { rate: 5 });

        let first = submit_at(&engine, 100, addr(1), content.clone()).unwrap();
        assert_eq!(first.status, ProposalStatus::Active);

        let entries = state.all_entries().unwrap();
        let version = state.version();
        let err = submit_at(&engine, 120, addr(2), content.clone()).unwrap_err();
        assert_eq!(err.code(), "route_not_found");
        assert_eq!(state.all_entries().unwrap(), entries);
        assert_eq!(state.version(), version);

        let err = submit_at(&engine, 151, addr(2), content).unwrap_err();
        assert!(matches!(err, RelayVoteError::ProposalAlreadyExpired));
        assert_eq!(
            engine.proposal(&first.proposal_id).unwrap().status,
            ProposalStatus::Expired
        );
    }

    #[test]
    fn test_lazy_expiry() {
        let (engine, _) = setup(2);

        let id = submit_at(&engine, 100, addr(1), era(3)).unwrap().proposal_id;
        // Last voting height is 150
        let mut ctx = TxContext::new(Height::new(151));
        let err = engine.submit(&mut ctx, &addr(2), era(3)).unwrap_err();

        assert!(matches!(err, RelayVoteError::ProposalAlreadyExpired));
        assert_eq!(ctx.events.of_kind(EVENT_PROPOSAL_EXPIRED).count(), 1);

        let record = engine.proposal(&id).unwrap();
        assert_eq!(record.status, ProposalStatus::Expired);
        assert_eq!(record.vote_count(), 1);

        // Terminal from now on, even for admins
        let err = submit_at(&engine, 152, admin(), era(3)).unwrap_err();
        assert!(matches!(err, RelayVoteError::ProposalAlreadyExpired));
    }

    #[test]
    fn test_vote_on_last_height_counts() {
        let (engine, _) = setup(2);

        submit_at(&engine, 100, addr(1), era(3)).unwrap();
        let response = submit_at(&engine, 150, addr(2), era(3)).unwrap();
        assert_eq!(response.status, ProposalStatus::Approved);
    }

    #[test]
    fn test_events_merged_on_approval() {
        let (engine, _) = setup(1);
        let mut ctx = TxContext::new(Height::new(5));

        engine.submit(&mut ctx, &addr(1), era(2)).unwrap();

        let kinds: Vec<&str> = ctx.events.events().iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec![EVENT_SUBMIT_PROPOSAL, ERA_EVENT]);
        let submit = &ctx.events.events()[0];
        assert_eq!(submit.get("status"), Some("approved"));
    }

    #[test]
    fn test_failed_dispatch_emits_nothing() {
        let (engine, _) = setup(1);
        let mut ctx = TxContext::new(Height::new(5));

        assert!(engine.submit(&mut ctx, &addr(1), era(0)).is_err());
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn test_set_life() {
        let (engine, _) = setup(2);
        let mut ctx = TxContext::new(Height::new(1));

        let err = engine.set_life(&mut ctx, &addr(1), 10).unwrap_err();
        assert!(matches!(err, RelayVoteError::NotAuthorized));

        let old = submit_at(&engine, 100, addr(1), era(5)).unwrap().proposal_id;

        let param = engine.set_life(&mut ctx, &admin(), 10).unwrap();
        assert_eq!(param.value, 10);
        assert_eq!(engine.proposal_life().unwrap(), param);
        assert_eq!(ctx.events.of_kind(EVENT_SET_PROPOSAL_LIFE).count(), 1);

        // New proposals take the new life, existing ones keep theirs
        let new = submit_at(&engine, 100, addr(1), era(6)).unwrap().proposal_id;
        assert_eq!(engine.proposal(&new).unwrap().life, 10);
        assert_eq!(engine.proposal(&old).unwrap().life, 50);

        let record = engine.proposal(&old).unwrap();
        assert!(!engine.is_expired(&record, Height::new(120)));
    }

    #[test]
    fn test_identity_shared_across_engines() {
        let (a, _) = setup(2);
        let (b, _) = setup(2);

        let from_a = submit_at(&a, 1, addr(1), era(8)).unwrap().proposal_id;
        let from_b = submit_at(&b, 99, addr(2), era(8)).unwrap().proposal_id;
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn test_proposals_listing_and_missing() {
        let (engine, _) = setup(2);
        submit_at(&engine, 1, addr(1), era(1)).unwrap();
        submit_at(&engine, 1, addr(1), era(2)).unwrap();

        assert_eq!(engine.proposals().unwrap().len(), 2);
        let err = engine.proposal(&relayvote_core::Hash::ZERO).unwrap_err();
        assert_eq!(err.code(), "proposal_not_found");
    }
}
