//! Page state returned by every terminal engine reply.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::deserialize_lenient_string;
use crate::{AppError, Result};

/// Declared interaction shape for a field.
///
/// The engine sends capture types either by name or by legacy numeric
/// code; both are translated here and nowhere else.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaptureType {
    /// Plain text entry.
    #[default]
    TextBox,
    /// Single choice rendered as radio buttons.
    RadioButton,
    /// Multiple choice rendered as check boxes.
    CheckBox,
    /// Single choice from a drop-down list.
    DropDown,
    /// Drop-down list that also accepts typed values.
    ComboBox,
    /// Calendar date.
    Date,
    /// Numeric keypad entry.
    NumberPad,
    /// Barcode scan.
    Barcode,
    /// Bounded numeric slider.
    Slider,
    /// Two-state toggle.
    ToggleButton,
    /// Photo capture.
    Photo,
    /// Signature capture.
    Signature,
    /// Audio capture.
    Audio,
    /// Anything the client does not recognize.
    Unknown,
}

impl CaptureType {
    /// Translate an engine capture-type name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "textbox" | "text" => Self::TextBox,
            "radiobutton" | "radio" => Self::RadioButton,
            "checkbox" => Self::CheckBox,
            "dropdown" => Self::DropDown,
            "combobox" | "combo" => Self::ComboBox,
            "date" => Self::Date,
            "numberpad" => Self::NumberPad,
            "barcode" => Self::Barcode,
            "slider" => Self::Slider,
            "togglebutton" | "toggle" => Self::ToggleButton,
            "photo" => Self::Photo,
            "signature" => Self::Signature,
            "audio" => Self::Audio,
            _ => Self::Unknown,
        }
    }

    /// Translate a legacy numeric capture-type code.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::TextBox,
            1 => Self::RadioButton,
            2 => Self::CheckBox,
            3 => Self::DropDown,
            4 => Self::ComboBox,
            5 => Self::Date,
            6 => Self::NumberPad,
            7 => Self::Barcode,
            8 => Self::Slider,
            9 => Self::ToggleButton,
            10 => Self::Photo,
            11 => Self::Signature,
            12 => Self::Audio,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for CaptureType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(name)) => match name.trim().parse::<i64>() {
                Ok(code) => Self::from_code(code),
                Err(_) => Self::from_name(&name),
            },
            Some(Value::Number(n)) => n.as_i64().map_or(Self::Unknown, Self::from_code),
            None | Some(Value::Null) => Self::TextBox,
            Some(_) => Self::Unknown,
        })
    }
}

/// Whether the engine enforces strict path order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    /// Engine enforces forward path order.
    #[default]
    #[serde(alias = "system_controlled")]
    System,
    /// Operator may move freely.
    #[serde(alias = "operator_controlled")]
    Operator,
}

/// One entry of a field's value set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEntry {
    /// Code submitted to the engine.
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub code: String,
    /// Label shown to the operator.
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub label: String,
    /// Display color, if the value set defines one.
    #[serde(default)]
    pub color: Option<String>,
}

/// Numeric range for slider capture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SliderRange {
    /// Lowest selectable value.
    pub min: f64,
    /// Highest selectable value.
    pub max: f64,
    /// Increment between values.
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_step() -> f64 {
    1.0
}

/// Identity of a field instance: name plus roster occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    /// Field identifier.
    pub name: String,
    /// 1-based occurrence, `None` outside repeating groups.
    pub occurrence: Option<u32>,
}

impl FieldKey {
    /// Build a key.
    #[must_use]
    pub fn new(name: impl Into<String>, occurrence: Option<u32>) -> Self {
        Self {
            name: name.into(),
            occurrence,
        }
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.occurrence {
            Some(occ) => write!(f, "{}({occ})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A field of the current display unit as described by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field identifier.
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Declared capture type.
    #[serde(default, rename = "captureType")]
    pub capture: CaptureType,
    /// Occurrence indexes, outermost first.
    #[serde(default)]
    pub occurrences: Vec<u32>,
    /// Whether the field lives inside a repeating group.
    #[serde(default, rename = "inRoster")]
    pub in_repeating_group: bool,
    /// Value set entries.
    #[serde(default)]
    pub responses: Vec<ResponseEntry>,
    /// Current value.
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub value: String,
    /// Whether the field is numeric.
    #[serde(default)]
    pub numeric: bool,
    /// Slider range, when the engine provides one.
    #[serde(default)]
    pub slider: Option<SliderRange>,
    /// Date format such as `YYYYMMDD`.
    #[serde(default)]
    pub date_format: Option<String>,
}

impl FieldDescriptor {
    /// Build a plain text field; used for tests and synthetic pages.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            capture: CaptureType::TextBox,
            occurrences: Vec::new(),
            in_repeating_group: false,
            responses: Vec::new(),
            value: String::new(),
            numeric: false,
            slider: None,
            date_format: None,
        }
    }

    /// Key of this field instance (innermost occurrence).
    #[must_use]
    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.name.clone(), self.occurrences.last().copied())
    }

    /// Whether the field carries a non-empty value set.
    #[must_use]
    pub fn has_value_set(&self) -> bool {
        !self.responses.is_empty()
    }
}

/// Terminal engine reply: the current display unit and its authoritative field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// Name of the display unit (form), if reported.
    #[serde(default)]
    pub form_name: Option<String>,
    /// Fields of the display unit in flattened order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Index of the authoritative field.
    #[serde(default, rename = "currentIndex")]
    pub current: Option<usize>,
    /// Path discipline currently enforced by the engine.
    #[serde(default)]
    pub path_mode: PathMode,
    /// Result of query and scripting operations.
    #[serde(default)]
    pub value: Option<Value>,
}

impl PageState {
    /// Check the authority invariant: exactly one current field whenever
    /// the sequence is non-empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the page names no current field,
    /// or an index outside the sequence.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Ok(());
        }
        match self.current {
            Some(idx) if idx < self.fields.len() => Ok(()),
            Some(idx) => Err(AppError::Protocol(format!(
                "current index {idx} outside page of {} fields",
                self.fields.len()
            ))),
            None => Err(AppError::Protocol(
                "page has fields but no current field".into(),
            )),
        }
    }

    /// The authoritative field, if any.
    #[must_use]
    pub fn current_field(&self) -> Option<&FieldDescriptor> {
        self.current.and_then(|idx| self.fields.get(idx))
    }

    /// Position of `key` in the flattened order.
    #[must_use]
    pub fn index_of(&self, key: &FieldKey) -> Option<usize> {
        self.fields.iter().position(|f| &f.key() == key)
    }
}
