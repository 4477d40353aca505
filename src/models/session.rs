//! Session model and lifecycle helpers.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque session identity token issued by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Borrow the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Lifecycle state for an engine session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Identity exists but no application is loaded.
    Uninitialized,
    /// Entry application loaded into the engine.
    ApplicationLoaded,
    /// Data entry in progress.
    EntryStarted,
    /// Entry stopped; may be restarted.
    Stopped,
}

/// Engine session owned by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Identity token used by every channel call.
    pub id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Application loaded into this session, if any.
    pub application: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Construct a freshly bootstrapped session.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Uninitialized,
            application: None,
            created_at: Utc::now(),
        }
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self.state, next),
            (
                SessionState::Uninitialized | SessionState::ApplicationLoaded,
                SessionState::ApplicationLoaded
            ) | (
                SessionState::ApplicationLoaded | SessionState::Stopped,
                SessionState::EntryStarted
            ) | (
                SessionState::EntryStarted | SessionState::ApplicationLoaded,
                SessionState::Stopped
            )
        )
    }
}
