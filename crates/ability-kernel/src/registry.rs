//! Ability registry.
//!
//! Tracks every ability known to the host: its registration description,
//! whether it may currently be invoked, and simple invocation bookkeeping.
//!
//! Backed by [`DashMap`] so it can be shared across session tasks without a
//! global lock.
//!
//! # Example
//!
//! ```rust
//! # use ability_kernel::registry::{AbilityRegistry, AbilityStatus};
//! let registry = AbilityRegistry::new();
//! registry.register("weather", "Current weather", vec!["weather".into()]);
//!
//! registry.mark_invoked("weather").unwrap();
//! let info = registry.get("weather").unwrap();
//! assert_eq!(info.invocation_count, 1);
//! assert_eq!(info.status, AbilityStatus::Ready);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Whether an ability may be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityStatus {
    /// Registered and invocable.
    Ready,
    /// A session for this ability is currently running.
    Running,
    /// Switched off by the operator.
    Disabled,
}

impl std::fmt::Display for AbilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// Snapshot of a registered ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityInfo {
    /// Unique name from the ability's manifest.
    pub id: String,
    pub description: String,
    /// Trigger phrases as registered.
    pub hotwords: Vec<String>,
    pub status: AbilityStatus,
    pub registered_at: DateTime<Utc>,
    pub last_invoked_at: Option<DateTime<Utc>>,
    pub invocation_count: u64,
    /// Most recent session error, if any.  Cleared on the next clean run.
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Concurrent ability registry.  Cheap to clone.
#[derive(Clone, Default)]
pub struct AbilityRegistry {
    inner: Arc<DashMap<String, AbilityInfo>>,
}

impl AbilityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ability, replacing any previous entry with the same id.
    pub fn register(
        &self,
        id: impl Into<String>,
        description: impl Into<String>,
        hotwords: Vec<String>,
    ) {
        let id = id.into();
        tracing::info!(ability = %id, hotwords = hotwords.len(), "ability registered");

        self.inner.insert(
            id.clone(),
            AbilityInfo {
                id,
                description: description.into(),
                hotwords,
                status: AbilityStatus::Ready,
                registered_at: Utc::now(),
                last_invoked_at: None,
                invocation_count: 0,
                last_error: None,
            },
        );
    }

    /// Remove an ability.  Returns the removed entry if it existed.
    pub fn unregister(&self, id: &str) -> Option<AbilityInfo> {
        let removed = self.inner.remove(id).map(|(_, info)| info);
        if removed.is_some() {
            tracing::info!(ability = %id, "ability unregistered");
        }
        removed
    }

    /// Snapshot of one ability.
    pub fn get(&self, id: &str) -> Result<AbilityInfo> {
        self.inner
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(id))
    }

    /// All abilities, sorted by id.
    pub fn list(&self) -> Vec<AbilityInfo> {
        let mut all: Vec<AbilityInfo> = self.inner.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Replace the hotword list of a registered ability.
    pub fn set_hotwords(&self, id: &str, hotwords: Vec<String>) -> Result<()> {
        let mut entry = self.inner.get_mut(id).ok_or_else(|| not_found(id))?;
        entry.hotwords = hotwords;
        Ok(())
    }

    /// Update the status of a registered ability.
    pub fn set_status(&self, id: &str, status: AbilityStatus) -> Result<()> {
        let mut entry = self.inner.get_mut(id).ok_or_else(|| not_found(id))?;
        let old = entry.status;
        entry.status = status;
        tracing::debug!(ability = %id, from = %old, to = %status, "ability status changed");
        Ok(())
    }

    /// Fail unless the ability exists and is not disabled.
    pub fn ensure_available(&self, id: &str) -> Result<()> {
        let entry = self.inner.get(id).ok_or_else(|| not_found(id))?;
        if entry.status == AbilityStatus::Disabled {
            return Err(KernelError::AbilityUnavailable {
                ability_id: id.to_string(),
                status: entry.status.to_string(),
            });
        }
        Ok(())
    }

    /// Record the start of a session.
    pub fn mark_invoked(&self, id: &str) -> Result<()> {
        let mut entry = self.inner.get_mut(id).ok_or_else(|| not_found(id))?;
        entry.invocation_count += 1;
        entry.last_invoked_at = Some(Utc::now());
        entry.status = AbilityStatus::Running;
        Ok(())
    }

    /// Record the end of a session.  A clean finish clears `last_error`.
    pub fn mark_finished(&self, id: &str, error: Option<String>) -> Result<()> {
        let mut entry = self.inner.get_mut(id).ok_or_else(|| not_found(id))?;
        if let Some(ref e) = error {
            tracing::warn!(ability = %id, error = %e, "ability session failed");
        }
        entry.last_error = error;
        if entry.status == AbilityStatus::Running {
            entry.status = AbilityStatus::Ready;
        }
        Ok(())
    }
}

fn not_found(id: &str) -> KernelError {
    KernelError::AbilityNotFound {
        ability_id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
