//! Per-display-unit navigation records.

use tracing::debug;

use crate::models::form::FormDefinition;
use crate::models::navigation::NavigationRecord;
use crate::models::page::FieldKey;

/// Bookkeeping for every field instance of one display unit.
///
/// Built once from the structural definition when a display unit is
/// entered and dropped when the next one replaces it.
#[derive(Debug, Clone, Default)]
pub struct NavigationTable {
    form: String,
    records: Vec<NavigationRecord>,
}

impl NavigationTable {
    /// Build records for `definition`: standalone fields, then each group's
    /// fields for every occurrence.
    #[must_use]
    pub fn from_definition(definition: &FormDefinition) -> Self {
        let mut records: Vec<NavigationRecord> = definition
            .fields
            .iter()
            .map(|f| NavigationRecord::new(f.name.clone(), None, None))
            .collect();
        for group in &definition.groups {
            for occurrence in 1..=group.max_occurrences {
                records.extend(group.fields.iter().map(|f| {
                    NavigationRecord::new(f.name.clone(), Some(occurrence), Some(group.name.clone()))
                }));
            }
        }
        debug!(form = %definition.name, records = records.len(), "navigation table built");
        Self {
            form: definition.name.clone(),
            records,
        }
    }

    /// Table for `form` whose structure could not be fetched; holds no
    /// records.
    #[must_use]
    pub fn empty(form: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            records: Vec::new(),
        }
    }

    /// Display unit the table belongs to.
    #[must_use]
    pub fn form(&self) -> &str {
        &self.form
    }

    /// All records in flattened order.
    #[must_use]
    pub fn records(&self) -> &[NavigationRecord] {
        &self.records
    }

    /// Record for `key`, if the display unit declares it.
    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&NavigationRecord> {
        self.records.iter().find(|r| r.matches(key))
    }

    /// Mark `key` as visited.
    pub fn mark_visited(&mut self, key: &FieldKey) {
        if let Some(record) = self.records.iter_mut().find(|r| r.matches(key)) {
            record.visited = true;
        }
    }

    /// Remember the last value seen for `key`.
    pub fn record_value(&mut self, key: &FieldKey, value: &str) {
        if let Some(record) = self.records.iter_mut().find(|r| r.matches(key)) {
            record.last_value = Some(value.to_owned());
        }
    }

    /// Number of visited records.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.records.iter().filter(|r| r.visited).count()
    }
}
