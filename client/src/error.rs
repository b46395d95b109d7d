//! Error types for the Leadmail client.
//!
//! - [`ServiceError`] - Calls to the draft/refactor/send collaborators
//! - [`SessionError`] - Row editing session operations
//! - [`ConfigError`] - Environment configuration
//! - [`ServerError`] - Mock collaborator server
//! - [`CliError`] - Top-level errors surfaced by the `leadmail` binary
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Errors from a call to one of the remote email services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response (connection refused, timeout...).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The service answered with something other than 200.
    #[error("API returned status code {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered 200 but the body was not JSON.
    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// Failed to read the file to upload.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// HTTP status code, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors from row editing session operations.
///
/// None of these are fatal: the session stays usable after any of them.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Row index outside the loaded result set. Displayed 1-based.
    #[error("Lead {} does not exist ({} leads loaded)", .index + 1, .len)]
    RowOutOfRange { index: usize, len: usize },

    /// The operation needs the row's editor to be open.
    #[error("Editor for lead {} is not open (use 'open {}' first)", .0 + 1, .0 + 1)]
    EditorClosed(usize),

    /// Collaborator call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    /// The base URL is empty or has no scheme.
    #[error("Invalid API URL: {0:?}")]
    InvalidUrl(String),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// Mock collaborator server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bind or serve failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// CLI Errors (top-level)
// =============================================================================

/// Errors returned by the `leadmail` binary's commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Collaborator error.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Session error.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Mock server error.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Only `.xlsx` spreadsheets are accepted for upload.
    #[error("Unsupported file type: {0} (expected an .xlsx file)")]
    UnsupportedFile(String),

    /// Local IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for the mock server.
pub type ServerResult<T> = Result<T, ServerError>;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ServiceError -> SessionError -> CliError
        let service_err = ServiceError::Status { status: 502, body: "bad gateway".into() };
        let session_err: SessionError = service_err.into();
        assert!(session_err.to_string().contains("502"));

        let cli_err: CliError = session_err.into();
        assert!(cli_err.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_status_accessor() {
        let err = ServiceError::Status { status: 404, body: String::new() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(ServiceError::Transport("refused".into()).status(), None);
    }

    #[test]
    fn test_session_error_format() {
        let err = SessionError::RowOutOfRange { index: 5, len: 2 };
        let msg = err.to_string();
        assert!(msg.contains("Lead 6"));
        assert!(msg.contains("2 leads"));
    }
}
