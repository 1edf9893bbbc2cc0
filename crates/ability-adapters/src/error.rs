//! Adapter error types.
//!
//! Every variant names the service it came from so a spoken fallback can
//! be chosen without inspecting strings.

/// Unified error type for service adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The request exceeded the fixed timeout.
    #[error("{service} timed out after {seconds}s")]
    Timeout { service: String, seconds: u64 },

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: String, status: u16 },

    /// The request could not be sent or the connection failed.
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    /// The body was not the JSON shape we expected.
    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse { service: String, reason: String },

    /// The service had no result for the query.
    #[error("{service} found nothing for `{query}`")]
    NotFound { service: String, query: String },

    /// The request could not be built (bad URL, bad parameters).
    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },
}

impl AdapterError {
    /// Whether the failure was the clock rather than the service.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
