//! Domain model module declarations.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod case_tree;
pub mod form;
pub mod navigation;
pub mod operation;
pub mod page;
pub mod session;
pub mod suspension;

/// Deserialize a value the engine may send as string, number, or bool.
///
/// Response codes and field values arrive as `"1"` or `1` depending on the
/// field's numeric-ness; the client always works with the string form.
/// `null` and missing values become the empty string.
pub(crate) fn deserialize_lenient_string<'de, D>(
    deserializer: D,
) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    })
}
