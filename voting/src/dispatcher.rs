//! Execution dispatcher
//!
//! Runs an approved proposal's action inside an [`ExecutionScope`] and hands
//! back the buffered writes and events. Committing them is the caller's job;
//! on any error the scope is dropped and nothing it wrote survives.

use relayvote_core::{
    Height, ProposalContent, RelayVoteError, RelayVoteResult, StateChange, StateProvider,
};
use relayvote_state::CacheStore;
use tracing::{debug, warn};

use crate::events::EventLog;
use crate::router::{ExecutionScope, Router};

/// Outcome of a successful dispatch, ready to commit
#[derive(Debug, Default)]
pub struct Execution {
    pub changes: Vec<StateChange>,
    pub events: EventLog,
}

/// Route `content` to its handler and run it against a buffer over `parent`
pub fn dispatch(
    router: &Router,
    parent: &dyn StateProvider,
    height: Height,
    content: &ProposalContent,
) -> RelayVoteResult<Execution> {
    let route = content.route();
    let handler = router
        .route(route)
        .ok_or(RelayVoteError::RouteNotFound(route))?;

    let mut scope = ExecutionScope::new(CacheStore::new(parent), height);

    if let Err(e) = handler.handle(&mut scope, &content.denom, &content.action) {
        warn!("Handler for {} failed on {}: {}", route, content.denom, e);
        return Err(RelayVoteError::ExecutionFailed {
            route,
            source: Box::new(e),
        });
    }

    let ExecutionScope { store, events, .. } = scope;
    let changes = store.into_changes();
    debug!("Handler for {} buffered {} writes", route, changes.len());

    Ok(Execution { changes, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::router::ActionHandler;
    use relayvote_core::{Action, ActionRoute, StateMutator};
    use relayvote_state::MemoryStateStore;
    use std::sync::Arc;

    /// Writes a marker, then fails if the era is odd
    struct EvenEra;

    impl ActionHandler for EvenEra {
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
            scope.store.set(denom.as_bytes(), &era.to_be_bytes())?;
            scope.emit(Event::new("era").attr("era", era));
            if era % 2 == 1 {
                return Err(RelayVoteError::InvalidAction("odd era".into()));
            }
            Ok(())
        }
    }

    fn router() -> Router {
        Router::new().with_handler(Arc::new(EvenEra))
    }

    #[test]
    fn test_success_returns_buffered_writes() {
        let state = MemoryStateStore::new();
        let content = ProposalContent::new("usdx", Action::SetChainEra { era: 4 });

        let execution = dispatch(&router(), &state, Height::new(1), &content).unwrap();

        assert_eq!(execution.changes.len(), 1);
        assert_eq!(execution.events.len(), 1);
        // Nothing reaches the parent until the caller commits
        assert!(state.is_empty());
    }

    #[test]
    fn test_failure_discards_writes() {
        let state = MemoryStateStore::new();
        let content = ProposalContent::new("usdx", Action::SetChainEra { era: 3 });

        let err = dispatch(&router(), &state, Height::new(1), &content).unwrap_err();

        match err {
            RelayVoteError::ExecutionFailed { route, source } => {
                assert_eq!(route, ActionRoute::ChainEra);
                assert_eq!(source.code(), "invalid_action");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(state.is_empty());
    }

    #[test]
    fn test_missing_route() {
        let state = MemoryStateStore::new();
        let content = ProposalContent::new("usdx", Action::SetExchangeRate { rate: 1 });

        let err = dispatch(&router(), &state, Height::new(1), &content).unwrap_err();
        assert!(matches!(err, RelayVoteError::RouteNotFound(ActionRoute::ExchangeRate)));
    }
}
