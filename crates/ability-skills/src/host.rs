//! Ability invocation and the local host harness.
//!
//! [`AbilityHost`] plays the platform's part: it routes utterances through
//! the trigger gate, builds a [`Worker`] for each invocation, runs the
//! session as a managed task under a timeout, and counts how often the
//! session resumed the host's normal flow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ability_agent::{ResumeCounter, ResumeGuard, Speech, TextModel, Worker};
use ability_kernel::{AbilityInfo, AbilityRegistry, SessionTasks, TriggerGate, TriggerMatch};
use ability_store::FileStorage;
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SkillError};
use crate::manifest::AbilityManifest;
use crate::session::{Conversation, run_session};

/// Spoken when an ability fails outright.
pub const CRASH_MESSAGE: &str = "Something went wrong. Exiting.";

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// How long to wait for a torn-down session to release its worker.
const RESUME_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Ability
// ---------------------------------------------------------------------------

/// A voice-triggered plugin.
#[async_trait]
pub trait Ability: Send + Sync {
    fn manifest(&self) -> &AbilityManifest;

    /// Run one session.  Must not resume normal flow itself.
    async fn run(&self, worker: &Worker) -> Result<()>;
}

/// Adapts a [`Conversation`] factory into an [`Ability`].  Every
/// invocation gets a fresh conversation.
pub struct ConversationAbility<F> {
    manifest: AbilityManifest,
    factory: F,
}

impl<F, C> ConversationAbility<F>
where
    F: Fn() -> C + Send + Sync,
    C: Conversation + 'static,
{
    pub fn new(manifest: AbilityManifest, factory: F) -> Self {
        Self { manifest, factory }
    }
}

#[async_trait]
impl<F, C> Ability for ConversationAbility<F>
where
    F: Fn() -> C + Send + Sync,
    C: Conversation + 'static,
{
    fn manifest(&self) -> &AbilityManifest {
        &self.manifest
    }

    async fn run(&self, worker: &Worker) -> Result<()> {
        let mut conversation = (self.factory)();
        let summary = run_session(&mut conversation, worker).await?;
        debug!(
            ability = %self.manifest.unique_name,
            turns = summary.turns,
            reason = %summary.reason,
            "conversation finished"
        );
        Ok(())
    }
}

/// Run `ability` and resume normal flow exactly once, whatever happens.
///
/// A failed session speaks [`CRASH_MESSAGE`] before resuming.  The error
/// is still returned for the host's bookkeeping.
pub async fn run_ability(ability: &dyn Ability, worker: &Worker) -> Result<()> {
    let result = ability.run(worker).await;

    if let Err(ref e) = result {
        error!(ability = %ability.manifest().unique_name, error = %e, "ability failed");
        if let Err(speak_err) = worker.speak(CRASH_MESSAGE).await {
            debug!(error = %speak_err, "could not speak crash message");
        }
    }

    worker.resume_normal_flow();
    result
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// How an invocation ended, from the host's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed(String),
    /// The session outlived the timeout and was torn down.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationReport {
    pub ability: String,
    pub outcome: SessionOutcome,
    /// Times the resume callback fired.  Always 1 for a correct ability.
    pub resume_calls: usize,
}

#[derive(Debug, Clone)]
pub struct HostSettings {
    pub session_timeout: Duration,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

/// Local stand-in for the host platform.
pub struct AbilityHost {
    registry: AbilityRegistry,
    gate: TriggerGate,
    abilities: HashMap<String, Arc<dyn Ability>>,
    model: Arc<dyn TextModel>,
    storage: Arc<dyn FileStorage>,
    settings: HostSettings,
}

impl AbilityHost {
    pub fn new(model: Arc<dyn TextModel>, storage: Arc<dyn FileStorage>) -> Self {
        Self {
            registry: AbilityRegistry::new(),
            gate: TriggerGate::new(),
            abilities: HashMap::new(),
            model,
            storage,
            settings: HostSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: HostSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &AbilityRegistry {
        &self.registry
    }

    /// Registered abilities, sorted by id.
    pub fn abilities(&self) -> Vec<AbilityInfo> {
        let mut list = self.registry.list();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Register an ability under its manifest's `unique_name`.
    pub fn register(&mut self, ability: Arc<dyn Ability>) -> Result<()> {
        let manifest = ability.manifest().clone();
        let id = manifest.unique_name.clone();
        if self.abilities.contains_key(&id) {
            return Err(SkillError::AlreadyRegistered { ability: id });
        }

        self.gate
            .add_hotwords(manifest.matching_hotwords.iter().map(String::as_str), id.as_str())?;
        self.registry
            .register(id.as_str(), manifest.description, manifest.matching_hotwords);
        self.abilities.insert(id, ability);
        Ok(())
    }

    /// Replace built-in hotwords with those from manifests on disk.
    ///
    /// Manifests for unknown abilities and manifests that fail validation
    /// are skipped with a warning.  Returns how many were applied.
    pub fn apply_manifests(&mut self, manifests: &[AbilityManifest]) -> Result<usize> {
        let mut applied = 0;
        for manifest in manifests {
            let id = manifest.unique_name.as_str();
            if !self.abilities.contains_key(id) {
                warn!(ability = %id, "manifest for unknown ability, skipping");
                continue;
            }
            let report = manifest.validate();
            if !report.is_ok() {
                warn!(ability = %id, errors = ?report.errors, "invalid manifest, skipping");
                continue;
            }

            self.gate.remove_ability(id);
            self.gate
                .add_hotwords(manifest.matching_hotwords.iter().map(String::as_str), id)?;
            self.registry
                .set_hotwords(id, manifest.matching_hotwords.clone())?;
            info!(ability = %id, hotwords = manifest.matching_hotwords.len(), "hotwords overridden");
            applied += 1;
        }
        Ok(applied)
    }

    pub fn route(&self, utterance: &str) -> TriggerMatch {
        self.gate.resolve(utterance)
    }

    /// Run one session of `ability_id` with `speech` as the user.
    pub async fn invoke(
        &self,
        ability_id: &str,
        speech: Arc<dyn Speech>,
        trigger: &str,
    ) -> Result<InvocationReport> {
        let ability = self
            .abilities
            .get(ability_id)
            .cloned()
            .ok_or_else(|| SkillError::NotFound(ability_id.to_string()))?;
        self.registry.ensure_available(ability_id)?;
        self.registry.mark_invoked(ability_id)?;

        let tasks = SessionTasks::new(uuid::Uuid::now_v7().to_string());
        let counter = ResumeCounter::new();
        let (resumed_tx, resumed_rx) = oneshot::channel::<()>();
        let counted = counter.guard();
        let resume = ResumeGuard::new(move || {
            counted.resume();
            let _ = resumed_tx.send(());
        });

        let worker = Worker::new(speech, Arc::clone(&self.model), Arc::clone(&self.storage))
            .with_tasks(tasks.clone())
            .with_resume(resume)
            .with_trigger_transcription(trigger);

        info!(ability = %ability_id, session = %tasks.session(), "invoking ability");

        let (done_tx, mut done_rx) = oneshot::channel();
        tasks.spawn(format!("session:{ability_id}"), async move {
            let result = run_ability(ability.as_ref(), &worker).await;
            drop(worker);
            let _ = done_tx.send(result);
        })?;

        let timeout = self.settings.session_timeout;
        let outcome = match tokio::time::timeout(timeout, &mut done_rx).await {
            Ok(Ok(Ok(()))) => SessionOutcome::Completed,
            Ok(Ok(Err(e))) => SessionOutcome::Failed(e.to_string()),
            Ok(Err(_)) => SessionOutcome::Failed("session task ended without a result".into()),
            Err(_) => {
                warn!(ability = %ability_id, seconds = timeout.as_secs(), "session timed out");
                SessionOutcome::TimedOut
            }
        };

        // Aborts the session if it is still running, and any background
        // work it started.  Dropping its worker resumes normal flow.
        tasks.close();
        if tokio::time::timeout(RESUME_GRACE, resumed_rx).await.is_err() {
            warn!(ability = %ability_id, "session did not release its worker in time");
        }

        let error = match &outcome {
            SessionOutcome::Completed => None,
            SessionOutcome::Failed(reason) => Some(reason.clone()),
            SessionOutcome::TimedOut => Some(
                SkillError::Timeout {
                    ability: ability_id.to_string(),
                    seconds: timeout.as_secs(),
                }
                .to_string(),
            ),
        };
        self.registry.mark_finished(ability_id, error)?;

        let report = InvocationReport {
            ability: ability_id.to_string(),
            outcome,
            resume_calls: counter.count(),
        };
        info!(
            ability = %ability_id,
            outcome = ?report.outcome,
            resume_calls = report.resume_calls,
            "invocation finished"
        );
        Ok(report)
    }

    /// Route `utterance` and invoke the matched ability, if any.
    pub async fn handle_utterance(
        &self,
        utterance: &str,
        speech: Arc<dyn Speech>,
    ) -> Result<Option<InvocationReport>> {
        match self.route(utterance) {
            TriggerMatch::NoMatch { .. } => {
                debug!(utterance, "no ability matched");
                Ok(None)
            }
            matched => {
                let Some(id) = matched.ability() else {
                    return Ok(None);
                };
                self.invoke(id, speech, utterance).await.map(Some)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
