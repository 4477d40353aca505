//! Engine operations: one value per remote call.

use serde_json::{json, Value};

/// How data entry is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMode {
    /// Add a new case.
    Add,
    /// Modify the existing case identified by `key`.
    Modify {
        /// Case key as reported by the sequential-case-identifiers query.
        key: String,
    },
}

/// Target field for go-to-field and roster operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTarget {
    /// Field identifier.
    pub name: String,
    /// 1-based occurrence within a repeating group, if any.
    pub occurrence: Option<u32>,
}

impl FieldTarget {
    /// Build a target for `name` at an optional occurrence.
    #[must_use]
    pub fn new(name: impl Into<String>, occurrence: Option<u32>) -> Self {
        Self {
            name: name.into(),
            occurrence,
        }
    }

    fn to_json(&self) -> Value {
        json!({ "name": self.name, "occurrence": self.occurrence })
    }
}

/// A named remote call plus its payload.
///
/// Stateless; constructed per call and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Load the entry application into the session.
    LoadApplication {
        /// Application identifier or path on the engine host.
        application: String,
    },
    /// Start entry in add or modify mode.
    Start {
        /// Add or modify.
        mode: EntryMode,
        /// Operator identifier recorded by the engine.
        operator_id: Option<String>,
    },
    /// Stop entry, discarding the case in progress.
    Stop,
    /// Finish the current case.
    EndCase,
    /// Submit a value for the current field and advance.
    Advance {
        /// Raw value as typed or resolved by a dialog.
        value: String,
    },
    /// Move to the previous field.
    Previous,
    /// Move to an explicit field.
    GoToField(FieldTarget),
    /// End the current group.
    EndGroup,
    /// End the current level.
    EndLevel,
    /// End the current occurrence of a repeating group.
    EndGroupOccurrence,
    /// Insert an occurrence before the current one.
    InsertOccurrence,
    /// Insert an occurrence after the current one.
    InsertOccurrenceAfter,
    /// Delete the current occurrence.
    DeleteOccurrence,
    /// Sort the occurrences of the current group.
    SortOccurrences,
    /// Fetch the current page without moving.
    CurrentPage,
    /// Fetch the structural definition of the current display unit.
    FormStructure,
    /// Fetch the question text for a field.
    QuestionText(FieldTarget),
    /// Fetch the value set for a field.
    ValueSet(FieldTarget),
    /// Fetch the hierarchical case representation.
    CaseTree,
    /// List the case identifiers of the data file in sequence.
    SequentialCaseIds,
    /// Fetch engine status.
    Status,
    /// Evaluate a logic expression.
    EvaluateExpression {
        /// Expression text.
        expression: String,
    },
    /// Invoke a named user-defined function.
    InvokeFunction {
        /// Function name.
        name: String,
        /// Positional arguments.
        arguments: Vec<Value>,
    },
    /// Generic engine action identified by name.
    Action {
        /// Action name.
        name: String,
        /// Action arguments.
        arguments: Value,
    },
    /// Submit the resolution of a pending suspension.
    SubmitInteraction {
        /// Normalized resolution value.
        result: Value,
    },
}

impl Operation {
    /// Stable wire name used in the request path.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::LoadApplication { .. } => "load-application",
            Self::Start { .. } => "start",
            Self::Stop => "stop",
            Self::EndCase => "end-case",
            Self::Advance { .. } => "advance",
            Self::Previous => "previous",
            Self::GoToField(_) => "go-to-field",
            Self::EndGroup => "end-group",
            Self::EndLevel => "end-level",
            Self::EndGroupOccurrence => "end-group-occurrence",
            Self::InsertOccurrence => "insert-occurrence",
            Self::InsertOccurrenceAfter => "insert-occurrence-after",
            Self::DeleteOccurrence => "delete-occurrence",
            Self::SortOccurrences => "sort-occurrences",
            Self::CurrentPage => "current-page",
            Self::FormStructure => "form-structure",
            Self::QuestionText(_) => "question-text",
            Self::ValueSet(_) => "value-set",
            Self::CaseTree => "case-tree",
            Self::SequentialCaseIds => "sequential-case-ids",
            Self::Status => "status",
            Self::EvaluateExpression { .. } => "eval",
            Self::InvokeFunction { .. } => "invoke",
            Self::Action { .. } => "action",
            Self::SubmitInteraction { .. } => "submit-interaction",
        }
    }

    /// Whether the operation reads engine state without moving entry.
    ///
    /// Replies to queries may omit the page; callers must not treat such a
    /// reply as a change of the current field.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::FormStructure
                | Self::QuestionText(_)
                | Self::ValueSet(_)
                | Self::CaseTree
                | Self::SequentialCaseIds
                | Self::Status
                | Self::EvaluateExpression { .. }
                | Self::InvokeFunction { .. }
                | Self::Action { .. }
        )
    }

    /// JSON request body.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::LoadApplication { application } => json!({ "application": application }),
            Self::Start { mode, operator_id } => match mode {
                EntryMode::Add => json!({ "mode": "add", "operatorId": operator_id }),
                EntryMode::Modify { key } => {
                    json!({ "mode": "modify", "key": key, "operatorId": operator_id })
                }
            },
            Self::Advance { value } => json!({ "value": value }),
            Self::GoToField(target) | Self::QuestionText(target) | Self::ValueSet(target) => {
                target.to_json()
            }
            Self::EvaluateExpression { expression } => json!({ "expression": expression }),
            Self::InvokeFunction { name, arguments } => {
                json!({ "function": name, "arguments": arguments })
            }
            Self::Action { name, arguments } => json!({ "action": name, "arguments": arguments }),
            Self::SubmitInteraction { result } => json!({ "result": result }),
            Self::Stop
            | Self::EndCase
            | Self::Previous
            | Self::EndGroup
            | Self::EndLevel
            | Self::EndGroupOccurrence
            | Self::InsertOccurrence
            | Self::InsertOccurrenceAfter
            | Self::DeleteOccurrence
            | Self::SortOccurrences
            | Self::CurrentPage
            | Self::FormStructure
            | Self::CaseTree
            | Self::SequentialCaseIds
            | Self::Status => json!({}),
        }
    }
}
