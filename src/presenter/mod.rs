//! Interactive presentation contract.
//!
//! The [`InteractionPresenter`] is the UI collaborator that shows modal
//! interactions and returns the operator's answer. It is injected into the
//! [`SuspensionResolver`](crate::resolver::SuspensionResolver) and the
//! [`EntryController`](crate::controller::EntryController) at construction;
//! there is no global registration.

pub mod console;

use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Value};

use crate::channel::wire::normalize_resolution;
use crate::models::suspension::Suspension;
use crate::Result;

/// One selectable option in a choice dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Code returned when the option is chosen.
    pub code: String,
    /// Label shown to the operator.
    pub label: String,
    /// Display color, if any.
    pub color: Option<String>,
}

impl ChoiceOption {
    /// Build an option without a color.
    #[must_use]
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            color: None,
        }
    }
}

/// What the presenter is asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationRequest {
    /// Acknowledge-only notice, optionally with several buttons.
    Notice {
        /// Optional heading.
        title: Option<String>,
        /// Message body.
        message: String,
        /// Button captions; empty means a single acknowledge button.
        buttons: Vec<String>,
    },
    /// Pick one option.
    SingleChoice {
        /// Heading.
        title: String,
        /// Options in display order.
        options: Vec<ChoiceOption>,
        /// Index of the pre-selected option.
        preselected: Option<usize>,
        /// Whether a typed value outside the list is accepted.
        free_text: bool,
    },
    /// Pick any number of options.
    MultiChoice {
        /// Heading.
        title: String,
        /// Options in display order.
        options: Vec<ChoiceOption>,
        /// Indices selected on entry.
        selected: Vec<usize>,
        /// Upper bound on selections.
        max_selections: Option<usize>,
    },
    /// Bounded numeric slider.
    Slider {
        /// Heading.
        title: String,
        /// Lowest value.
        min: f64,
        /// Highest value.
        max: f64,
        /// Increment.
        step: f64,
        /// Value on entry.
        value: Option<f64>,
    },
    /// Calendar date.
    Date {
        /// Heading.
        title: String,
        /// Engine date format, e.g. `YYYYMMDD`.
        format: String,
        /// Value on entry.
        value: Option<String>,
    },
    /// Interaction the client has no dedicated presentation for.
    Custom {
        /// Interaction name from the engine.
        name: String,
        /// Raw input payload.
        input: Value,
    },
}

impl PresentationRequest {
    /// Short kind name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Notice { .. } => "notice",
            Self::SingleChoice { .. } => "single_choice",
            Self::MultiChoice { .. } => "multi_choice",
            Self::Slider { .. } => "slider",
            Self::Date { .. } => "date",
            Self::Custom { .. } => "custom",
        }
    }

    /// Translate an engine suspension into a presenter request.
    ///
    /// Unrecognized interaction names are passed through as
    /// [`PresentationRequest::Custom`].
    #[must_use]
    pub fn from_suspension(suspension: &Suspension) -> Self {
        let input = &suspension.input;
        let title = str_field(input, "title").unwrap_or_default();
        match suspension.name.as_str() {
            "message" | "errmsg" | "warning" | "notice" => Self::Notice {
                title: str_field(input, "title"),
                message: str_field(input, "message")
                    .or_else(|| input.as_str().map(str::to_owned))
                    .unwrap_or_default(),
                buttons: string_list(input.get("buttons")),
            },
            "choice" | "select" | "show" => {
                let options = options_from(input.get("options"));
                if input.get("multiple").and_then(Value::as_bool) == Some(true) {
                    let selected = index_list(input.get("selected"))
                        .into_iter()
                        .filter(|idx| *idx < options.len())
                        .collect();
                    Self::MultiChoice {
                        title,
                        options,
                        selected,
                        max_selections: input
                            .get("max")
                            .and_then(Value::as_u64)
                            .and_then(|n| usize::try_from(n).ok()),
                    }
                } else {
                    Self::SingleChoice {
                        title,
                        options,
                        preselected: input
                            .get("selected")
                            .and_then(Value::as_u64)
                            .and_then(|n| usize::try_from(n).ok()),
                        free_text: input.get("freeText").and_then(Value::as_bool) == Some(true),
                    }
                }
            }
            "slider" => Self::Slider {
                title,
                min: input.get("min").and_then(Value::as_f64).unwrap_or(0.0),
                max: input.get("max").and_then(Value::as_f64).unwrap_or(100.0),
                step: input.get("step").and_then(Value::as_f64).unwrap_or(1.0),
                value: input.get("value").and_then(Value::as_f64),
            },
            "date" => Self::Date {
                title,
                format: str_field(input, "format").unwrap_or_else(|| "YYYYMMDD".to_owned()),
                value: str_field(input, "value"),
            },
            other => Self::Custom {
                name: other.to_owned(),
                input: input.clone(),
            },
        }
    }
}

/// The operator's answer to a presentation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Acknowledged without a value; also the timeout default.
    Acknowledged,
    /// A concrete value (code, index, list of codes, number, date).
    Value(Value),
    /// Dialog closed without choosing anything.
    NoSelection,
    /// Explicit cancellation gesture.
    Cancelled,
}

impl Resolution {
    /// Value submitted to the engine for a suspension.
    ///
    /// Cancellation of an engine-initiated interaction is reported as
    /// "no selection": the engine is waiting and must receive an answer.
    #[must_use]
    pub fn into_wire(self) -> Value {
        match self {
            Self::Acknowledged => json!({ "acknowledged": true }),
            Self::Value(value) => normalize_resolution(value),
            Self::NoSelection | Self::Cancelled => Value::Null,
        }
    }
}

/// Boxed future returned by presenters.
pub type PresenterFuture<'a> = Pin<Box<dyn Future<Output = Result<Resolution>> + Send + 'a>>;

/// UI collaborator that shows modal interactions.
pub trait InteractionPresenter: Send + Sync {
    /// Show `request` and wait for the operator's resolution.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Presenter`](crate::AppError::Presenter) or
    /// [`AppError::Io`](crate::AppError::Io) if the presentation layer fails.
    /// Callers treat failures as "no selection".
    fn present(&self, request: PresentationRequest) -> PresenterFuture<'_>;
}

fn str_field(input: &Value, key: &str) -> Option<String> {
    input.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

fn index_list(value: Option<&Value>) -> Vec<usize> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|n| usize::try_from(n).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Options arrive either as plain labels (code = 1-based position) or as
/// `{code, label}` objects.
fn options_from(value: Option<&Value>) -> Vec<ChoiceOption> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(label) => ChoiceOption::new((idx + 1).to_string(), label.clone()),
            Value::Object(map) => ChoiceOption {
                code: map
                    .get("code")
                    .map_or_else(|| (idx + 1).to_string(), value_to_text),
                label: map.get("label").map(value_to_text).unwrap_or_default(),
                color: map.get("color").and_then(Value::as_str).map(str::to_owned),
            },
            other => ChoiceOption::new((idx + 1).to_string(), value_to_text(other)),
        })
        .collect()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
