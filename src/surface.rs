//! Presentation surface the control core writes into.

use std::collections::HashMap;

use crate::models::page::FieldKey;

/// Field-level view of the client's form presentation.
pub trait FormSurface: Send {
    /// Show `value` in the field instance `key`.
    fn write_value(&mut self, key: &FieldKey, value: &str);

    /// Move the visible focus to `key`.
    fn focus(&mut self, key: &FieldKey);

    /// Give transient feedback that focusing `key` was refused.
    fn signal_rejected(&mut self, key: &FieldKey);
}

/// In-memory surface used by the console front end and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySurface {
    values: HashMap<FieldKey, String>,
    focused: Option<FieldKey>,
    rejected: Vec<FieldKey>,
}

impl MemorySurface {
    /// Empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value shown for `key`.
    #[must_use]
    pub fn value(&self, key: &FieldKey) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of field instances holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field holding visible focus.
    #[must_use]
    pub fn focused(&self) -> Option<&FieldKey> {
        self.focused.as_ref()
    }

    /// Every refused focus target, oldest first.
    #[must_use]
    pub fn rejected(&self) -> &[FieldKey] {
        &self.rejected
    }
}

impl FormSurface for MemorySurface {
    fn write_value(&mut self, key: &FieldKey, value: &str) {
        self.values.insert(key.clone(), value.to_owned());
    }

    fn focus(&mut self, key: &FieldKey) {
        self.focused = Some(key.clone());
    }

    fn signal_rejected(&mut self, key: &FieldKey) {
        self.rejected.push(key.clone());
    }
}
