//! Typed error hierarchy for the Kanbanize client.
//!
//! Three top-level enums cover the three subsystems:
//! - `IdentityError` — identity-provider failures (sign-in, refresh, verification)
//! - `ApiError` — REST API failures, carrying the server `detail` field when present
//! - `ActionError` — capability-gated board/team mutations that were rejected
//!   locally or rolled back after a failed confirmation
//!
//! `WorkdayError` sits beside them for the workday tracker's own rejections.

use thiserror::Error;

/// Errors from the external identity provider.
///
/// Provider error codes (bad credentials, email already in use, weak password)
/// are surfaced verbatim — the provider's text is what the user sees.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    Provider(String),

    #[error("No active session. Run `kanbanize login` first")]
    NotSignedIn,

    #[error("Failed to read session cache at {path}: {source}")]
    CacheRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write session cache at {path}: {source}")]
    CacheWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed session cache: {0}")]
    CacheDecode(#[source] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors from the Kanbanize REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. `detail` is the server's `{"detail": ...}` body field
    /// when one was present.
    #[error("API returned {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// The server-provided `detail` message, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            ApiError::Http(_) => None,
        }
    }

    /// Toast text for a failed operation: `"<action> failed: <detail>"` when
    /// the server sent a detail body, otherwise the raw error message.
    pub fn action_failed(&self, action: &str) -> String {
        match self.detail() {
            Some(detail) => format!("{action} failed: {detail}"),
            None => format!("{action} failed: {self}"),
        }
    }
}

/// A board or team mutation that was rejected before or rolled back after the
/// network round-trip. Local state is unchanged whenever one of these is
/// returned.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    NotPermitted(String),

    #[error("Card {0} not found")]
    CardNotFound(i64),

    #[error("Team {0} not found")]
    TeamNotFound(i64),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0}")]
    Invalid(&'static str),

    #[error("You must start your workday in WorkDay Tracker to {0}")]
    WorkdayClosed(&'static str),

    #[error("Cannot move expired sprint task. It has been moved to Backlog")]
    SprintExpired,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors from the workday tracker state machine.
#[derive(Debug, Error)]
pub enum WorkdayError {
    #[error("You can start a new workday after {0} minutes")]
    CoolDown(i64),

    #[error("A workday is already running")]
    AlreadyRunning,

    #[error("No active workday to end")]
    NoActiveWorkday,

    #[error(transparent)]
    Api(#[from] ApiError),
}
