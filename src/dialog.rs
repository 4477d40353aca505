//! Dialog arbiter: maps field meaning to interaction shape.
//!
//! The engine communicates what a field means (capture type, value set)
//! but not how it is presented. [`DialogArbiter`] is the single place that
//! turns meaning into a [`PresentationPlan`], builds the presenter request
//! for modal plans, and converts the operator's answer back into the value
//! submitted with the ordinary advance operation.

use serde_json::Value;
use tracing::{debug, info_span};

use crate::models::page::{CaptureType, FieldDescriptor};
use crate::presenter::{ChoiceOption, PresentationRequest, Resolution};

/// Default engine date format.
pub const DEFAULT_DATE_FORMAT: &str = "YYYYMMDD";

/// How a field's value must be collected before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationPlan {
    /// Value taken directly from what the operator typed.
    Inline,
    /// Modal single-choice list.
    ModalSingleSelect,
    /// Modal multi-choice list.
    ModalMultiSelect,
    /// Modal numeric slider.
    ModalSlider,
    /// Modal calendar.
    ModalDate,
    /// The field takes no keyed or dialog input.
    None,
}

impl PresentationPlan {
    /// Whether the plan requires a modal presentation.
    #[must_use]
    pub fn is_modal(self) -> bool {
        !matches!(self, Self::Inline | Self::None)
    }
}

/// What to do after a modal presentation resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    /// Submit this value with advance-with-value.
    Submit(String),
    /// Abandon the advance; focus returns to the field.
    Abandon,
}

/// Decides per field which presentation precedes submission.
pub struct DialogArbiter;

impl DialogArbiter {
    /// Decide the presentation plan for `field`.
    ///
    /// Evaluation order:
    /// 1. Check box with a value set → multi-select.
    /// 2. Radio button with a value set → single-select.
    /// 3. Drop-down/combo box with a value set outside a repeating group →
    ///    single-select. Inside a repeating group the native inline control
    ///    supplies the value.
    /// 4. Slider → slider.
    /// 5. Date → date.
    /// 6. Any other capture type with a value set → single-select.
    /// 7. Capture-only types without a value set → none.
    /// 8. Otherwise → inline.
    #[must_use]
    pub fn decide_presentation(field: &FieldDescriptor) -> PresentationPlan {
        let _span = info_span!("decide_presentation", field = %field.name).entered();
        let has_values = field.has_value_set();

        let plan = match field.capture {
            // ── 1. Check box ─────────────────────────────────
            CaptureType::CheckBox if has_values => PresentationPlan::ModalMultiSelect,
            // ── 2. Radio button ──────────────────────────────
            CaptureType::RadioButton if has_values => PresentationPlan::ModalSingleSelect,
            // ── 3. Drop-down / combo box ─────────────────────
            CaptureType::DropDown | CaptureType::ComboBox if has_values => {
                if field.in_repeating_group {
                    PresentationPlan::Inline
                } else {
                    PresentationPlan::ModalSingleSelect
                }
            }
            // ── 4. Slider ────────────────────────────────────
            CaptureType::Slider => PresentationPlan::ModalSlider,
            // ── 5. Date ──────────────────────────────────────
            CaptureType::Date => PresentationPlan::ModalDate,
            // ── 6. Any other value set ───────────────────────
            _ if has_values => PresentationPlan::ModalSingleSelect,
            // ── 7. Capture-only types ────────────────────────
            CaptureType::Photo | CaptureType::Signature | CaptureType::Audio => {
                PresentationPlan::None
            }
            // ── 8. Inline ────────────────────────────────────
            _ => PresentationPlan::Inline,
        };

        debug!(capture = ?field.capture, has_values, ?plan, "presentation decided");
        plan
    }

    /// Build the presenter request for a modal plan.
    ///
    /// Returns `None` for inline and none plans.
    #[must_use]
    pub fn build_request(
        field: &FieldDescriptor,
        plan: PresentationPlan,
    ) -> Option<PresentationRequest> {
        let title = if field.label.is_empty() {
            field.name.clone()
        } else {
            field.label.clone()
        };
        let options: Vec<ChoiceOption> = field
            .responses
            .iter()
            .map(|entry| ChoiceOption {
                code: entry.code.clone(),
                label: entry.label.clone(),
                color: entry.color.clone(),
            })
            .collect();

        match plan {
            PresentationPlan::ModalSingleSelect => {
                let preselected = options
                    .iter()
                    .position(|opt| !field.value.is_empty() && opt.code.trim() == field.value.trim());
                Some(PresentationRequest::SingleChoice {
                    title,
                    options,
                    preselected,
                    free_text: field.numeric,
                })
            }
            PresentationPlan::ModalMultiSelect => {
                let selected = selected_codes(&field.value, &options);
                Some(PresentationRequest::MultiChoice {
                    title,
                    options,
                    selected,
                    max_selections: None,
                })
            }
            PresentationPlan::ModalSlider => {
                let range = field.slider.map_or_else(
                    || numeric_span(&options),
                    |r| (r.min, r.max, r.step),
                );
                Some(PresentationRequest::Slider {
                    title,
                    min: range.0,
                    max: range.1,
                    step: range.2,
                    value: field.value.trim().parse().ok(),
                })
            }
            PresentationPlan::ModalDate => Some(PresentationRequest::Date {
                title,
                format: field
                    .date_format
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_owned()),
                value: Some(field.value.clone()).filter(|v| !v.trim().is_empty()),
            }),
            PresentationPlan::Inline | PresentationPlan::None => None,
        }
    }

    /// Convert the operator's answer into the value to submit.
    #[must_use]
    pub fn value_from_resolution(plan: PresentationPlan, resolution: Resolution) -> FieldInput {
        match resolution {
            Resolution::Cancelled => FieldInput::Abandon,
            Resolution::NoSelection | Resolution::Acknowledged => FieldInput::Submit(String::new()),
            Resolution::Value(value) => FieldInput::Submit(match plan {
                PresentationPlan::ModalMultiSelect => concatenate_codes(&value),
                PresentationPlan::ModalSlider => render_number(&value),
                _ => scalar_text(&value),
            }),
        }
    }
}

/// Indices of options whose codes make up a stored check-box value.
///
/// The value is read segment by segment: separated tokens when the engine
/// delimits codes, fixed-width chunks when every code has the same width,
/// and otherwise a left-to-right longest-code scan. A code is never matched
/// as a substring of another.
fn selected_codes(value: &str, options: &[ChoiceOption]) -> Vec<usize> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }
    let find = |segment: &str| options.iter().position(|opt| !opt.code.is_empty() && opt.code == segment);

    let segments: Vec<String> = if value.contains([',', ';', ' ']) {
        value
            .split([',', ';', ' '])
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect()
    } else if let Some(width) = common_code_width(options) {
        let chars: Vec<char> = value.chars().collect();
        chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
    } else {
        longest_code_scan(value, options)
    };

    let mut selected: Vec<usize> = segments.iter().filter_map(|segment| find(segment)).collect();
    selected.sort_unstable();
    selected.dedup();
    selected
}

/// Width shared by every non-empty code, if they all agree.
fn common_code_width(options: &[ChoiceOption]) -> Option<usize> {
    let mut widths = options
        .iter()
        .filter(|opt| !opt.code.is_empty())
        .map(|opt| opt.code.chars().count());
    let first = widths.next()?;
    widths.all(|w| w == first).then_some(first)
}

/// Split `value` into codes, always taking the longest code that matches at
/// the current position. Stops at the first position no code matches.
fn longest_code_scan(value: &str, options: &[ChoiceOption]) -> Vec<String> {
    let mut codes: Vec<&str> = options
        .iter()
        .map(|opt| opt.code.as_str())
        .filter(|code| !code.is_empty())
        .collect();
    codes.sort_by_key(|code| std::cmp::Reverse(code.len()));

    let mut segments = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let Some(code) = codes.iter().find(|code| rest.starts_with(**code)) else {
            break;
        };
        segments.push((*code).to_owned());
        rest = &rest[code.len()..];
    }
    segments
}

/// Span of the numeric codes in a value set; `0..100` when none parse.
fn numeric_span(options: &[ChoiceOption]) -> (f64, f64, f64) {
    let numbers: Vec<f64> = options
        .iter()
        .filter_map(|opt| opt.code.trim().parse::<f64>().ok())
        .collect();
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if numbers.is_empty() {
        (0.0, 100.0, 1.0)
    } else {
        (min, max, 1.0)
    }
}

fn concatenate_codes(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        other => scalar_text(other),
    }
}

fn render_number(value: &Value) -> String {
    match value.as_f64() {
        Some(number) if number.fract().abs() < f64::EPSILON && number.abs() < 1e15 => {
            format!("{number:.0}")
        }
        Some(number) => number.to_string(),
        None => scalar_text(value),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
