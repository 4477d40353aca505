//! Structural definition of a display unit.

use serde::{Deserialize, Serialize};

use crate::models::page::CaptureType;

/// A field as declared by the form structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Field identifier.
    pub name: String,
    /// Human-readable label; may be empty.
    #[serde(default)]
    pub label: String,
    /// Declared capture type.
    #[serde(default, rename = "captureType")]
    pub capture: CaptureType,
}

impl FieldDefinition {
    /// Most human-readable name for the field: label, else identifier.
    #[must_use]
    pub fn display_label(&self) -> &str {
        let label = self.label.trim();
        if label.is_empty() {
            &self.name
        } else {
            label
        }
    }
}

/// A repeating group (roster) and its fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    /// Group identifier.
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Maximum number of occurrences.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: u32,
    /// Fields repeated per occurrence.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

fn default_max_occurrences() -> u32 {
    1
}

/// Structural definition of one display unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    /// Display unit name.
    #[serde(default)]
    pub name: String,
    /// Fields outside any repeating group.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Repeating groups.
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
}

impl FormDefinition {
    /// Every field declaration: standalone fields first, then group fields,
    /// each paired with its owning group.
    pub fn all_fields(&self) -> impl Iterator<Item = (&FieldDefinition, Option<&GroupDefinition>)> {
        self.fields.iter().map(|f| (f, None)).chain(
            self.groups
                .iter()
                .flat_map(|g| g.fields.iter().map(move |f| (f, Some(g)))),
        )
    }

    /// Number of declared fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.all_fields().count()
    }
}
