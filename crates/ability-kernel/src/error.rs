//! Kernel error types.
//!
//! Every public API in this crate returns [`KernelError`].

use uuid::Uuid;

/// Unified error type for the ability host kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Trigger errors -----------------------------------------------------
    /// A regex trigger supplied to the gate is invalid.
    #[error("invalid trigger pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A hotword was empty after normalisation.
    #[error("empty hotword for ability {ability_id}")]
    EmptyHotword { ability_id: String },

    // -- Registry errors ----------------------------------------------------
    /// The requested ability is not registered.
    #[error("ability not found: {ability_id}")]
    AbilityNotFound { ability_id: String },

    /// The ability is registered but may not be invoked.
    #[error("ability unavailable: {ability_id} (status: {status})")]
    AbilityUnavailable { ability_id: String, status: String },

    // -- Session task errors ------------------------------------------------
    /// The session has ended; no more managed work is accepted.
    #[error("session {session} is closed")]
    SessionClosed { session: String },

    /// The referenced task was never spawned in this session.
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: Uuid },
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
