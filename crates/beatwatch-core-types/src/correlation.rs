//! Correlation types for request tracking
//!
//! Every inbound operation carries a `RequestContext` so that log lines and
//! structured errors emitted while serving it can be tied back together.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single inbound request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh time-ordered RequestId (UUIDv7)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an id received from an upstream caller
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trace identifier propagated from an outer gateway, if any
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request correlation context
///
/// `actor_id` is the authenticated user on whose behalf the request runs.
/// System-initiated work (cascades, sweeps) uses [`RequestContext::system`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub trace_id: Option<TraceId>,
    pub actor_id: String,
}

/// Actor id recorded for work the engine performs on its own
pub const SYSTEM_ACTOR: &str = "SYSTEM";

impl RequestContext {
    /// Create a context for the given actor with a fresh RequestId
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            trace_id: None,
            actor_id: actor_id.into(),
        }
    }

    /// Context for engine-initiated work
    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR)
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn is_system(&self) -> bool {
        self.actor_id == SYSTEM_ACTOR
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::system()
    }
}
