//! Intent error types.

/// Unified error type for the intent crate.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// The model output could not be read as a JSON object.
    #[error("failed to parse intent: {reason}")]
    ParseFailed { reason: String },

    /// A keyword phrase could not be compiled into a matcher.
    #[error("invalid keyword `{phrase}`: {reason}")]
    InvalidKeyword { phrase: String, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error propagated from the agent crate.
    #[error("agent error: {0}")]
    Agent(#[from] ability_agent::AgentError),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
