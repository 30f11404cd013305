//! Observability events emitted while processing submissions

use relayvote_core::Height;
use serde::{Deserialize, Serialize};

pub const EVENT_SUBMIT_PROPOSAL: &str = "submit_proposal";
pub const EVENT_PROPOSAL_EXPIRED: &str = "proposal_expired";
pub const EVENT_SET_PROPOSAL_LIFE: &str = "set_proposal_life";
pub const EVENT_REGISTRY_UPDATE: &str = "registry_update";

/// A typed event with string attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// First attribute value with the given key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered event stream of one submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Append another stream after this one
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Per-call execution context handed in by the transaction layer
#[derive(Debug, Clone)]
pub struct TxContext {
    pub height: Height,
    pub events: EventLog,
}

impl TxContext {
    pub fn new(height: Height) -> Self {
        Self {
            height,
            events: EventLog::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }
}
