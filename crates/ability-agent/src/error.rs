//! Agent error types.
//!
//! Everything a [`crate::Worker`] touches surfaces errors through
//! [`AgentError`].  Session code decides which of them are fatal with
//! [`AgentError::is_fatal`].

/// Unified error type for the worker layer.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- LLM errors ----------------------------------------------------------
    /// An HTTP request to the LLM provider failed (transport, timeout, or a
    /// non-success status).
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The LLM response could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    // -- Host errors ---------------------------------------------------------
    /// Speech output or transcription failed.  The session cannot continue.
    #[error("speech i/o failed: {reason}")]
    Speech { reason: String },

    /// Configuration validation or loading failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    // -- Serialization -------------------------------------------------------
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from the kernel crate (closed session, unknown
    /// task).
    #[error("kernel error: {0}")]
    Kernel(#[from] ability_kernel::KernelError),

    /// An error propagated from the storage layer.
    #[error("store error: {0}")]
    Store(#[from] ability_store::StoreError),

    // -- Generic -------------------------------------------------------------
    #[error("internal agent error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Errors after which the conversation cannot go on: the user can no
    /// longer be heard or spoken to, or the host has torn the session down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Speech { .. }
                | Self::Kernel(ability_kernel::KernelError::SessionClosed { .. })
        )
    }
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(
            AgentError::Speech {
                reason: "mic unplugged".into()
            }
            .is_fatal()
        );
        assert!(
            AgentError::Kernel(ability_kernel::KernelError::SessionClosed {
                session: "s".into()
            })
            .is_fatal()
        );
        assert!(
            !AgentError::LlmRequestFailed {
                reason: "503".into()
            }
            .is_fatal()
        );
        assert!(!AgentError::Internal("x".into()).is_fatal());
    }
}
