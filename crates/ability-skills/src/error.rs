//! Error types for abilities and the host harness.

use std::path::PathBuf;

/// Errors raised while loading, hosting, or running an ability.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("ability not found: `{0}`")]
    NotFound(String),

    #[error("invalid manifest `{path}`: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("ability `{ability}` is already registered")]
    AlreadyRegistered { ability: String },

    #[error("ability `{ability}` did not finish within {seconds}s")]
    Timeout { ability: String, seconds: u64 },

    #[error("agent error: {0}")]
    Agent(#[from] ability_agent::AgentError),

    #[error("kernel error: {0}")]
    Kernel(#[from] ability_kernel::KernelError),

    #[error("store error: {0}")]
    Store(#[from] ability_store::StoreError),

    #[error("intent error: {0}")]
    Intent(#[from] ability_intent::IntentError),

    #[error("adapter error: {0}")]
    Adapter(#[from] ability_adapters::AdapterError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SkillError {
    /// Whether the session has to stop: speech I/O is gone or the host has
    /// closed the session.  Everything else becomes a spoken apology.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Agent(e) => e.is_fatal(),
            Self::Kernel(ability_kernel::KernelError::SessionClosed { .. }) => true,
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkillError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ability_agent::AgentError;
    use ability_kernel::KernelError;

    #[test]
    fn fatal_classification() {
        let speech: SkillError = AgentError::Speech {
            reason: "gone".into(),
        }
        .into();
        assert!(speech.is_fatal());

        let closed: SkillError = KernelError::SessionClosed {
            session: "s1".into(),
        }
        .into();
        assert!(closed.is_fatal());

        let llm: SkillError = AgentError::LlmRequestFailed {
            reason: "503".into(),
        }
        .into();
        assert!(!llm.is_fatal());
        assert!(!SkillError::Internal("x".into()).is_fatal());
    }
}
