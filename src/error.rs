//! Error Types
//!
//! Misuse of the session API (protocol and usage errors) and requests for
//! unsupported features are reported through [`SessionError`]. Operational
//! failures such as an engine returning a non-zero exit code are reported
//! through [`Status`](crate::Status) instead.

use thiserror::Error;

/// Errors raised by the session coordination layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The caller broke the session protocol (e.g. unknown participant,
    /// resource handle outliving its session).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The requested feature exists in the API but has no implementation yet.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// An operation was attempted on an object in the wrong state.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A workflow or work specification failed validation.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// The engine refused a request.
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Returns true for errors that indicate a client programming error.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Usage(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SessionError::Protocol("unknown participant 'A'".to_string());
        assert_eq!(err.to_string(), "Protocol error: unknown participant 'A'");

        let err = SessionError::NotImplemented("checkpoint signals".to_string());
        assert_eq!(err.to_string(), "Not implemented: checkpoint signals");
    }

    #[test]
    fn test_misuse_classification() {
        assert!(SessionError::Protocol(String::new()).is_misuse());
        assert!(SessionError::Usage(String::new()).is_misuse());
        assert!(!SessionError::NotImplemented(String::new()).is_misuse());
        assert!(!SessionError::Engine(String::new()).is_misuse());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SessionError = io.into();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
