//! JSON wire contract for engine replies.
//!
//! Every operation reply is an envelope whose `status` field discriminates
//! a terminal page (`"ok"`) from a suspension (`"suspended"`). Error
//! responses are classified here as well, so the session-not-found signal
//! is recognized in exactly one place.

use serde::Deserialize;
use serde_json::Value;

use crate::models::page::PageState;
use crate::models::session::SessionId;
use crate::models::suspension::{OperationResult, Outcome, Suspension};
use crate::{AppError, Result};

/// Marker the engine places in error bodies for evicted sessions.
const SESSION_NOT_FOUND_MARKER: &str = "session not found";

/// Maximum number of body characters copied into error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    status: String,
    #[serde(default)]
    page: Option<PageState>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    interaction: Option<Suspension>,
    #[serde(default)]
    notices: Vec<Suspension>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreated {
    session_id: String,
}

/// Decode an operation reply body.
///
/// # Errors
///
/// Returns `AppError::Protocol` if the body is not a valid envelope, the
/// status is unknown, a suspension lacks its interaction, or the page
/// violates the authority invariant.
pub fn decode_reply(body: &str) -> Result<OperationResult> {
    let envelope: ReplyEnvelope = serde_json::from_str(body)?;

    let outcome = match envelope.status.as_str() {
        "ok" => {
            let mut page = envelope.page.unwrap_or_default();
            if envelope.value.is_some() {
                page.value = envelope.value;
            }
            page.validate()?;
            Outcome::Page(page)
        }
        "suspended" => {
            let interaction = envelope.interaction.ok_or_else(|| {
                AppError::Protocol("suspended reply without interaction".into())
            })?;
            Outcome::Suspended(interaction)
        }
        other => {
            return Err(AppError::Protocol(format!(
                "unknown reply status '{other}'"
            )))
        }
    };

    Ok(OperationResult {
        outcome,
        notices: envelope.notices,
    })
}

/// Decode the bootstrap reply carrying a new session identity.
///
/// # Errors
///
/// Returns `AppError::Protocol` if the body has no usable session id.
pub fn decode_session_created(body: &str) -> Result<SessionId> {
    let created: SessionCreated = serde_json::from_str(body)?;
    if created.session_id.trim().is_empty() {
        return Err(AppError::Protocol("engine returned an empty session id".into()));
    }
    Ok(SessionId(created.session_id))
}

/// Classify a non-success HTTP response.
///
/// Only a body naming the session as missing maps to
/// `AppError::SessionNotFound`; every other body is opaque.
#[must_use]
pub fn classify_error(status: u16, body: &str) -> AppError {
    if body.to_ascii_lowercase().contains(SESSION_NOT_FOUND_MARKER) {
        return AppError::SessionNotFound(clip(body));
    }
    if status == 503 {
        return AppError::EngineUnavailable(format!("engine returned 503: {}", clip(body)));
    }
    AppError::Transport(format!("{status}: {}", clip(body)))
}

/// Unwrap nested `{"result": …}` envelopes around a resolution value.
#[must_use]
pub fn normalize_resolution(mut value: Value) -> Value {
    loop {
        match value {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("result") => {
                value = map.remove("result").unwrap_or(Value::Null);
            }
            other => return other,
        }
    }
}

fn clip(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_owned()
    } else {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}...")
    }
}
