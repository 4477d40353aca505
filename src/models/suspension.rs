//! Suspended results and the discriminated operation outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::page::PageState;

/// A named interactive request issued by the engine mid-operation.
///
/// Carries no continuation: resolving it means submitting the captured
/// answer on the same session, which may yield another suspension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suspension {
    /// Interaction name, e.g. `message` or `choice`.
    pub name: String,
    /// Input the presentation layer needs to render the interaction.
    #[serde(default)]
    pub input: Value,
}

impl Suspension {
    /// Build a suspension.
    #[must_use]
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }
}

/// Terminal or non-terminal outcome of one operation. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Operation completed.
    Page(PageState),
    /// Operation is waiting for an interactive resolution.
    Suspended(Suspension),
}

/// Full result of one channel call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Terminal page or pending suspension.
    pub outcome: Outcome,
    /// Already-acknowledged informational suspensions, in engine order.
    pub notices: Vec<Suspension>,
}

impl OperationResult {
    /// Terminal result without notices.
    #[must_use]
    pub fn page(page: PageState) -> Self {
        Self {
            outcome: Outcome::Page(page),
            notices: Vec::new(),
        }
    }

    /// Suspended result without notices.
    #[must_use]
    pub fn suspended(suspension: Suspension) -> Self {
        Self {
            outcome: Outcome::Suspended(suspension),
            notices: Vec::new(),
        }
    }

    /// Attach informational notices.
    #[must_use]
    pub fn with_notices(mut self, notices: Vec<Suspension>) -> Self {
        self.notices = notices;
        self
    }
}
