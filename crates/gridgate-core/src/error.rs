//! Error taxonomy of the proxy.
//!
//! Errors are a numeric code plus a message, the same pair that rides the
//! JSON status envelope and the backend RPC replies. Codes below 100 are
//! transport-class (network failure, timeout): they may be retried against
//! another replica and are never surfaced verbatim to a client. Codes of
//! 100 and above are application-class and surface as-is.

use thiserror::Error;

/// Network-level failure (connect refused, reset, malformed frame).
pub const CODE_NETWORK_ERROR: u32 = 2;
/// The connect or overall deadline of an RPC elapsed.
pub const CODE_TIMEOUT: u32 = 10;

pub const CODE_BAD_REQUEST: u32 = 400;
pub const CODE_FORBIDDEN: u32 = 403;
pub const CODE_NOT_FOUND: u32 = 404;
pub const CODE_NAMESPACE_NOT_MANAGED: u32 = 418;
pub const CODE_TYPE_NOT_MANAGED: u32 = 460;
pub const CODE_POLICY_NOT_SATISFIABLE: u32 = 481;
pub const CODE_INTERNAL: u32 = 500;
pub const CODE_NOT_IMPLEMENTED: u32 = 501;
pub const CODE_UNAVAILABLE: u32 = 503;
pub const CODE_CONTENT_NOT_FOUND: u32 = 520;
pub const CODE_CONTAINER_NOT_FOUND: u32 = 530;
pub const CODE_CONTAINER_EXISTS: u32 = 533;

pub type GridResult<T> = Result<T, GridError>;

/// A domain error: status code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("({code}) {message}")]
pub struct GridError {
    code: u32,
    message: String,
}

impl GridError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Transport-class errors are retried across candidate replicas.
    pub fn is_transport(&self) -> bool {
        self.code < 100
    }

    /// Prepends a stage marker to the message, keeping the code.
    ///
    /// Used by the retry loops to record which stage failed, e.g.
    /// `"meta2 error: (2) connection refused"`.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self {
            code: self.code,
            message: format!("{}{}", prefix, self.message),
        }
    }

    /// Replaces the code, keeping the message.
    pub fn with_code(self, code: u32) -> Self {
        Self {
            code,
            message: self.message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CODE_NETWORK_ERROR, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(CODE_TIMEOUT, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(CODE_BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(CODE_FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CODE_NOT_FOUND, message)
    }

    pub fn namespace_not_managed(message: impl Into<String>) -> Self {
        Self::new(CODE_NAMESPACE_NOT_MANAGED, message)
    }

    pub fn type_not_managed(message: impl Into<String>) -> Self {
        Self::new(CODE_TYPE_NOT_MANAGED, message)
    }

    pub fn policy_not_satisfiable(message: impl Into<String>) -> Self {
        Self::new(CODE_POLICY_NOT_SATISFIABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CODE_INTERNAL, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(CODE_NOT_IMPLEMENTED, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CODE_UNAVAILABLE, message)
    }

    pub fn container_not_found(message: impl Into<String>) -> Self {
        Self::new(CODE_CONTAINER_NOT_FOUND, message)
    }

    pub fn content_not_found(message: impl Into<String>) -> Self {
        Self::new(CODE_CONTENT_NOT_FOUND, message)
    }
}
