//! Error types for objcache.
//!
//! Every failure is either a configuration error (raised while building a
//! store or a cached object) or a remote-access error (raised by a fetch or
//! a store). Not-found and not-modified are not errors; they are
//! [`FetchOutcome`](crate::types::FetchOutcome) variants.

use thiserror::Error;

/// Result type alias using `ObjcacheError`.
pub type Result<T> = std::result::Result<T, ObjcacheError>;

/// Main error type for all objcache operations.
#[derive(Debug, Error)]
pub enum ObjcacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Container or key missing or empty.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Store configuration error (bad endpoint, client build failure).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // REMOTE ACCESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    /// The store answered with a status that is neither success, 304 nor 404.
    #[error("Unexpected status {status} for '{location}': {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// `container/key` of the request
        location: String,
        /// Response body, possibly empty
        body: String,
    },

    /// A successful response did not carry a revision tag.
    #[error("Missing revision tag in response for '{0}'")]
    MissingRevisionTag(String),

    /// The store reported not-modified although no revision tag was presented.
    #[error("Store reported not-modified for '{0}' without a cached revision")]
    UnsolicitedNotModified(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ObjcacheError {
    /// Returns true if this error was raised while configuring a store or object.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ObjcacheError::InvalidLocation(_) | ObjcacheError::ConfigError(_)
        )
    }

    /// Returns true if this error came from talking to the remote store,
    /// including malformed payloads and serialization failures.
    pub fn is_remote_access_error(&self) -> bool {
        !self.is_configuration_error()
    }

    /// Returns true if the caller may reasonably retry the operation.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ObjcacheError::HttpError(_) | ObjcacheError::ConnectionTimeout(_) => true,
            ObjcacheError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ObjcacheError::UnexpectedStatus {
            status: 403,
            location: "bucket/key".into(),
            body: "AccessDenied".into(),
        };
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("bucket/key"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ObjcacheError::InvalidLocation("x".into()).is_configuration_error());
        assert!(ObjcacheError::ConfigError("x".into()).is_configuration_error());
        assert!(!ObjcacheError::HttpError("x".into()).is_configuration_error());

        assert!(ObjcacheError::HttpError("x".into()).is_remote_access_error());
        assert!(ObjcacheError::MissingRevisionTag("b/k".into()).is_remote_access_error());
        assert!(!ObjcacheError::InvalidLocation("x".into()).is_remote_access_error());
    }

    #[test]
    fn test_recoverable() {
        assert!(ObjcacheError::ConnectionTimeout("x".into()).is_recoverable());
        let throttled = ObjcacheError::UnexpectedStatus {
            status: 503,
            location: "b/k".into(),
            body: String::new(),
        };
        assert!(throttled.is_recoverable());
        let denied = ObjcacheError::UnexpectedStatus {
            status: 403,
            location: "b/k".into(),
            body: String::new(),
        };
        assert!(!denied.is_recoverable());
    }

    #[test]
    fn test_json_error_is_remote_access() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err = json_result.map_err(ObjcacheError::from).unwrap_err();
        assert!(matches!(err, ObjcacheError::JsonError(_)));
        assert!(err.is_remote_access_error());
    }
}
