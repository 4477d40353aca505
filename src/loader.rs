//! Case value loader for the modify-existing-record path.
//!
//! The engine reports an existing case as a labelled tree. The loader maps
//! tree labels back to field identifiers through the form structure and
//! writes the values into the surface before the operator interacts.
//!
//! Check-box fields are never written: the tree carries their human-readable
//! labels, not the underlying codes, so writing them would corrupt state.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, info_span, warn};

use crate::models::case_tree::{CaseNode, CaseNodeKind, CaseValueEntry};
use crate::models::form::{FieldDefinition, FormDefinition};
use crate::models::page::{CaptureType, FieldKey};
use crate::surface::FormSurface;

/// Summary of one population pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Values written into the surface.
    pub populated: usize,
    /// Fields declared by the form structure.
    pub total_fields: usize,
    /// Values skipped because the field captures check boxes.
    pub skipped_checkbox: usize,
    /// Values whose label matched no field.
    pub unmatched: usize,
}

/// Populates a surface from the engine's case tree.
pub struct CaseValueLoader;

impl CaseValueLoader {
    /// Write every resolvable case value into `surface`.
    pub fn populate(
        tree: &CaseNode,
        definition: &FormDefinition,
        surface: &mut dyn FormSurface,
    ) -> PopulateReport {
        let _span = info_span!("populate_case_values", form = %definition.name).entered();

        let fields = label_map(definition);
        let mut entries = Vec::new();
        collect_entries(tree, None, &mut entries);

        let mut report = PopulateReport {
            total_fields: definition.field_count(),
            ..PopulateReport::default()
        };

        for entry in entries {
            let Some(field) = fields.get(entry.label.trim()) else {
                warn!(label = %entry.label, "case value matches no field; skipped");
                report.unmatched += 1;
                continue;
            };
            if field.capture == CaptureType::CheckBox {
                debug!(field = %field.name, "check-box field skipped");
                report.skipped_checkbox += 1;
                continue;
            }
            let key = FieldKey::new(field.name.clone(), entry.occurrence);
            surface.write_value(&key, &entry.value);
            report.populated += 1;
        }

        info!(
            populated = report.populated,
            total_fields = report.total_fields,
            skipped_checkbox = report.skipped_checkbox,
            unmatched = report.unmatched,
            "case values populated"
        );
        report
    }
}

/// Map each field's most readable label to its definition: standalone
/// fields first, then group fields. The first field to claim a label wins.
fn label_map(definition: &FormDefinition) -> HashMap<String, &FieldDefinition> {
    let mut map = HashMap::new();
    for (field, _group) in definition.all_fields() {
        map.entry(field.display_label().to_owned()).or_insert(field);
    }
    map
}

/// Flatten the tree into value entries, assigning occurrences from
/// repeating-group children.
fn collect_entries(node: &CaseNode, occurrence: Option<u32>, out: &mut Vec<CaseValueEntry>) {
    match node.kind {
        CaseNodeKind::Value => out.push(CaseValueEntry {
            label: node.label.clone(),
            value: node.value.clone(),
            occurrence,
        }),
        CaseNodeKind::RepeatingGroup => {
            for (idx, child) in node.children.iter().enumerate() {
                let positional = u32::try_from(idx + 1).unwrap_or(u32::MAX);
                let occ = trailing_index(&child.label).unwrap_or(positional);
                collect_entries(child, Some(occ), out);
            }
        }
        _ => {
            for child in &node.children {
                collect_entries(child, occurrence, out);
            }
        }
    }
}

/// Occurrence number from a trailing `(n)` in a label.
fn trailing_index(label: &str) -> Option<u32> {
    static TRAILING: OnceLock<Option<Regex>> = OnceLock::new();
    TRAILING
        .get_or_init(|| Regex::new(r"\((\d+)\)\s*$").ok())
        .as_ref()?
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
