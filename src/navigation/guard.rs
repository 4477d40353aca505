//! Navigation-authority state machine.
//!
//! The engine is the sole source of truth for "the current field". The
//! guard mirrors that truth from terminal pages and decides whether a
//! client-originated focus change may proceed. It never learns from focus
//! events: [`NavigationGuard::observe`] is its only input besides the
//! modify-mode pass.

use tracing::{debug, info};

use crate::models::page::{FieldKey, PageState, PathMode};

/// Outcome of a focus authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Focus may move to the candidate.
    Allow,
    /// Candidate precedes the authoritative field; the move must go through
    /// an explicit go-to-field operation.
    AllowViaBackNavigation,
    /// Move violates the engine's path; focus returns to the authoritative field.
    Deny,
}

/// Tracks the authoritative field and path mode.
#[derive(Debug, Default)]
pub struct NavigationGuard {
    authoritative: Option<FieldKey>,
    path_mode: PathMode,
    modify_mode_armed: bool,
    order: Vec<FieldKey>,
}

impl NavigationGuard {
    /// Guard before entry starts: no authoritative field, system-controlled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the authority state reported by a terminal page.
    pub fn observe(&mut self, page: &PageState) {
        self.order = page.fields.iter().map(|f| f.key()).collect();
        self.authoritative = page.current_field().map(|f| f.key());
        self.path_mode = page.path_mode;
        debug!(
            authoritative = ?self.authoritative,
            path_mode = ?self.path_mode,
            fields = self.order.len(),
            "navigation authority updated"
        );
    }

    /// Let the next authorization through unconditionally, once.
    pub fn arm_modify_mode(&mut self) {
        self.modify_mode_armed = true;
    }

    /// Withdraw the modify-mode pass; the operator has interacted.
    pub fn disarm_modify_mode(&mut self) {
        if self.modify_mode_armed {
            debug!("modify mode pass withdrawn");
        }
        self.modify_mode_armed = false;
    }

    /// Whether the single-use modify-mode pass is still available.
    #[must_use]
    pub fn modify_mode_armed(&self) -> bool {
        self.modify_mode_armed
    }

    /// The engine's current field, if entry has started.
    #[must_use]
    pub fn authoritative_field(&self) -> Option<&FieldKey> {
        self.authoritative.as_ref()
    }

    /// Path discipline last reported by the engine.
    #[must_use]
    pub fn path_mode(&self) -> PathMode {
        self.path_mode
    }

    /// Position of `key` in the flattened order of the display unit.
    #[must_use]
    pub fn position(&self, key: &FieldKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// Key at `index` in the flattened order.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&FieldKey> {
        self.order.get(index)
    }

    /// Decide whether focus may move to `candidate` at `occurrence`.
    pub fn authorize(&mut self, candidate: &str, occurrence: Option<u32>) -> Decision {
        let key = FieldKey::new(candidate, occurrence);

        if self.modify_mode_armed {
            self.modify_mode_armed = false;
            info!(field = %key, "modify mode: first landing allowed");
            return Decision::Allow;
        }

        if self.path_mode == PathMode::Operator {
            return Decision::Allow;
        }

        let Some(ref current) = self.authoritative else {
            debug!(field = %key, "no authoritative field; denying");
            return Decision::Deny;
        };

        if *current == key {
            return Decision::Allow;
        }

        let decision = match (self.position(&key), self.position(current)) {
            (Some(candidate_idx), Some(current_idx)) if candidate_idx < current_idx => {
                Decision::AllowViaBackNavigation
            }
            _ => Decision::Deny,
        };
        debug!(field = %key, authoritative = %current, ?decision, "focus authorized");
        decision
    }
}
