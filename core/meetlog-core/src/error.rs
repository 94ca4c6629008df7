//! Error types for meetlog-core operations.
//!
//! Invariant violations (e.g. ending a segment that was never started) are
//! deliberately not represented here: they are programming errors, logged
//! loudly and recovered as no-ops rather than propagated to the view layer.

use thiserror::Error;

/// All errors that can surface from meetlog-core operations.
#[derive(Debug, Error)]
pub enum MeetlogError {
    /// A scan channel start/stop request failed or timed out. Non-fatal:
    /// the local state transition has already happened when this surfaces.
    #[error("scan channel error: {0}")]
    Channel(String),

    /// A persistence read or write failed. Writes are retried on the next
    /// reconciliation tick; reads fall back to a fresh session state.
    #[error("persistence error: {context}: {message}")]
    Persistence { context: String, message: String },

    /// A session switch was attempted while a recording is active. The view
    /// layer must stop the recording (with user confirmation) first.
    #[error("a recording is in progress; stop it before switching sessions")]
    SessionBusy,

    /// The referenced session id is not present in history.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MeetlogError {
    pub fn persistence(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        MeetlogError::Persistence {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience type alias for Results using MeetlogError.
pub type Result<T> = std::result::Result<T, MeetlogError>;
