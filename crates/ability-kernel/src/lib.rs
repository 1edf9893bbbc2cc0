//! Host kernel for voice abilities.
//!
//! This crate provides the host-side services every ability session relies
//! on:
//!
//! - **[`trigger`]** -- Hotword gate: Aho-Corasick phrase matching on word
//!   boundaries, regex triggers with named captures, and a no-match marker.
//! - **[`registry`]** -- Concurrent ability registry using [`DashMap`] with
//!   status and invocation bookkeeping.
//! - **[`tasks`]** -- Session-managed tokio tasks that are aborted when the
//!   session ends.
//! - **[`error`]** -- Unified kernel error types via [`thiserror`].
//!
//! [`DashMap`]: dashmap::DashMap

pub mod error;
pub mod registry;
pub mod tasks;
pub mod trigger;

// Re-export the most commonly used types at the crate root for convenience.
pub use error::{KernelError, Result};
pub use registry::{AbilityInfo, AbilityRegistry, AbilityStatus};
pub use tasks::{SessionTasks, TaskId, TaskState};
pub use trigger::{TriggerGate, TriggerMatch};
