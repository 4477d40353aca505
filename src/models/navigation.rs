//! Client-side navigation bookkeeping.

use serde::Serialize;

use crate::models::page::FieldKey;

/// Per-field bookkeeping for the lifetime of a display unit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavigationRecord {
    /// Field identifier.
    pub field: String,
    /// 1-based occurrence inside a repeating group.
    pub occurrence: Option<u32>,
    /// Owning group name, if the field repeats.
    pub group: Option<String>,
    /// Last value seen for the field.
    pub last_value: Option<String>,
    /// Whether the operator has landed on the field.
    pub visited: bool,
}

impl NavigationRecord {
    /// Fresh, unvisited record.
    #[must_use]
    pub fn new(field: impl Into<String>, occurrence: Option<u32>, group: Option<String>) -> Self {
        Self {
            field: field.into(),
            occurrence,
            group,
            last_value: None,
            visited: false,
        }
    }

    /// Whether this record describes `key`.
    #[must_use]
    pub fn matches(&self, key: &FieldKey) -> bool {
        self.field == key.name && self.occurrence == key.occurrence
    }
}
