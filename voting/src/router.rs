//! Action routing: discriminant -> statically registered handler

use relayvote_core::{Action, ActionRoute, Height, RelayVoteResult};
use relayvote_state::CacheStore;
use std::collections::HashMap;
use std::sync::Arc;

use crate::events::{Event, EventLog};

/// Isolated mutation scope handed to a handler.
///
/// Writes land in a [`CacheStore`] over the committed state and events in a
/// private log; neither is visible outside until the dispatcher commits them.
pub struct ExecutionScope<'a> {
    pub store: CacheStore<'a>,
    pub events: EventLog,
    pub height: Height,
}

impl<'a> ExecutionScope<'a> {
    pub fn new(store: CacheStore<'a>, height: Height) -> Self {
        Self {
            store,
            events: EventLog::new(),
            height,
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }
}

/// Applies one kind of approved action to state
pub trait ActionHandler: Send + Sync {
    /// The discriminant this handler serves
    fn route(&self) -> ActionRoute;

    /// Apply `action` for `denom` inside `scope`
    fn handle(
        &self,
        scope: &mut ExecutionScope<'_>,
        denom: &str,
        action: &Action,
    ) -> RelayVoteResult<()>;
}

/// Route table, filled once while the engine is built
#[derive(Clone, Default)]
pub struct Router {
    handlers: HashMap<ActionRoute, Arc<dyn ActionHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own route, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.route(), handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn route(&self, route: ActionRoute) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&route).cloned()
    }

    pub fn has_route(&self, route: ActionRoute) -> bool {
        self.handlers.contains_key(&route)
    }

    /// Registered routes in discriminant order
    pub fn routes(&self) -> Vec<ActionRoute> {
        let mut routes: Vec<_> = self.handlers.keys().copied().collect();
        routes.sort();
        routes
    }
}
