//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Client error enumeration covering all protocol and control failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// No live engine binding exists; fatal and never retried.
    EngineUnavailable(String),
    /// The engine no longer knows the session; recoverable once.
    SessionNotFound(String),
    /// Transport-level failure talking to the engine.
    Transport(String),
    /// Engine reply did not match the wire contract.
    Protocol(String),
    /// Interaction presenter failed to produce a resolution.
    Presenter(String),
    /// An operation was issued while another one is still outstanding.
    Busy(String),
    /// Lifecycle or navigation state does not permit the request.
    InvalidState(String),
    /// Console or file-system I/O failure.
    Io(String),
}

impl AppError {
    /// Whether this error signals an evicted session.
    #[must_use]
    pub fn is_session_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_))
    }

    /// Whether the error ends the interactive session.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EngineUnavailable(_) | Self::Io(_) | Self::Config(_))
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::EngineUnavailable(msg) => write!(f, "engine unavailable: {msg}"),
            Self::SessionNotFound(msg) => write!(f, "session not found: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Presenter(msg) => write!(f, "presenter: {msg}"),
            Self::Busy(msg) => write!(f, "busy: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("malformed engine payload: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::EngineUnavailable(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
