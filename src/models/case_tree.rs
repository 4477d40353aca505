//! Hierarchical case representation reported by the engine.

use serde::{Deserialize, Serialize};

use crate::models::deserialize_lenient_string;

/// Node type in the case tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseNodeKind {
    /// Root of the case.
    Case,
    /// Questionnaire level.
    Level,
    /// Record (single occurrence).
    #[default]
    Record,
    /// Repeating group; children are its occurrences.
    #[serde(alias = "roster")]
    RepeatingGroup,
    /// One occurrence of a repeating group.
    Occurrence,
    /// Leaf holding a field value.
    #[serde(alias = "field")]
    Value,
}

/// One node of the case tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseNode {
    /// Display label; occurrence nodes may end in `(n)`.
    #[serde(default)]
    pub label: String,
    /// Node type.
    #[serde(default, rename = "type")]
    pub kind: CaseNodeKind,
    /// Value for leaf nodes.
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub value: String,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<CaseNode>,
}

impl CaseNode {
    /// Leaf value node.
    #[must_use]
    pub fn value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: CaseNodeKind::Value,
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Interior node of `kind`.
    #[must_use]
    pub fn branch(label: impl Into<String>, kind: CaseNodeKind, children: Vec<CaseNode>) -> Self {
        Self {
            label: label.into(),
            kind,
            value: String::new(),
            children,
        }
    }
}

/// A value extracted from the case tree, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseValueEntry {
    /// Label the tree carried for the value.
    pub label: String,
    /// Value text.
    pub value: String,
    /// Occurrence inherited from the enclosing repeating group.
    pub occurrence: Option<u32>,
}
