//! The host contract an ability runs against.
//!
//! A [`Worker`] is handed to an ability for exactly one session.  It
//! bundles speech I/O, the text model, the user's file storage, the
//! session's managed tasks, and the resume-normal-flow callback.  The
//! callback is wrapped in a [`ResumeGuard`] so the host's normal flow is
//! resumed exactly once, even when the session future is dropped
//! mid-turn.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ability_kernel::SessionTasks;
use ability_store::FileStorage;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::Message;
use crate::model::TextModel;

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

/// Text-to-speech and transcription, as provided by the host.
#[async_trait]
pub trait Speech: Send + Sync {
    /// Say `text` to the user.
    async fn speak(&self, text: &str) -> Result<()>;

    /// The next transcribed utterance.  Empty means silence.
    async fn user_response(&self) -> Result<String>;

    /// Like [`user_response`](Self::user_response) but waits for the user to
    /// finish a longer utterance.
    async fn wait_for_complete_transcription(&self) -> Result<String> {
        self.user_response().await
    }
}

// ---------------------------------------------------------------------------
// Resume guard
// ---------------------------------------------------------------------------

type ResumeFn = Box<dyn FnOnce() + Send>;

/// Runs the host's resume-normal-flow callback at most once.
///
/// If the guard is dropped before [`resume`](Self::resume) was called (the
/// session panicked or was aborted), the callback runs from `Drop`.
pub struct ResumeGuard {
    callback: Mutex<Option<ResumeFn>>,
    resumed: AtomicBool,
}

impl ResumeGuard {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
            resumed: AtomicBool::new(false),
        }
    }

    /// A guard with nothing to call back, for hosts that do not care.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Hand control back to the host.  Returns `true` only for the call that
    /// actually ran the callback.
    pub fn resume(&self) -> bool {
        let callback = self.take();
        match callback {
            Some(callback) => {
                self.resumed.store(true, Ordering::SeqCst);
                callback();
                true
            }
            None => {
                debug!("resume already delivered, ignoring");
                false
            }
        }
    }

    pub fn has_resumed(&self) -> bool {
        self.resumed.load(Ordering::SeqCst)
    }

    fn take(&self) -> Option<ResumeFn> {
        self.callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

impl Drop for ResumeGuard {
    fn drop(&mut self) {
        if let Some(callback) = self.take() {
            warn!("session ended without resuming normal flow, resuming now");
            self.resumed.store(true, Ordering::SeqCst);
            callback();
        }
    }
}

impl std::fmt::Debug for ResumeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeGuard")
            .field("resumed", &self.has_resumed())
            .finish()
    }
}

/// Host-side resume callback that counts how often it fires.
#[derive(Debug, Clone, Default)]
pub struct ResumeCounter {
    count: Arc<AtomicUsize>,
}

impl ResumeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A guard whose callback bumps this counter.
    pub fn guard(&self) -> ResumeGuard {
        let count = Arc::clone(&self.count);
        ResumeGuard::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Per-session context handed to an ability.
pub struct Worker {
    speech: Arc<dyn Speech>,
    model: Arc<dyn TextModel>,
    storage: Arc<dyn FileStorage>,
    tasks: SessionTasks,
    resume: ResumeGuard,
    trigger: String,
    history: Mutex<Vec<Message>>,
}

impl Worker {
    pub fn new(
        speech: Arc<dyn Speech>,
        model: Arc<dyn TextModel>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            speech,
            model,
            storage,
            tasks: SessionTasks::new(uuid::Uuid::now_v7().to_string()),
            resume: ResumeGuard::noop(),
            trigger: String::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tasks(mut self, tasks: SessionTasks) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_resume(mut self, resume: ResumeGuard) -> Self {
        self.resume = resume;
        self
    }

    /// The phrase that triggered this session.
    pub fn with_trigger_transcription(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    // -- Speech --------------------------------------------------------------

    pub async fn speak(&self, text: &str) -> Result<()> {
        debug!(session = %self.tasks.session(), text, "speak");
        self.speech.speak(text).await
    }

    /// Next utterance, trimmed.
    pub async fn user_response(&self) -> Result<String> {
        let heard = self.speech.user_response().await?;
        debug!(session = %self.tasks.session(), heard = %heard, "heard");
        Ok(heard.trim().to_string())
    }

    /// Long-form utterance (journal entries), trimmed.
    pub async fn wait_for_complete_transcription(&self) -> Result<String> {
        Ok(self
            .speech
            .wait_for_complete_transcription()
            .await?
            .trim()
            .to_string())
    }

    /// Speak `prompt`, then listen.
    pub async fn run_io_loop(&self, prompt: &str) -> Result<String> {
        self.speak(prompt).await?;
        self.user_response().await
    }

    // -- Text model ----------------------------------------------------------

    pub async fn text_to_text(&self, prompt: &str) -> Result<String> {
        self.model.generate(prompt, &[], None).await
    }

    pub async fn text_to_text_with(
        &self,
        prompt: &str,
        history: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        self.model.generate(prompt, history, system_prompt).await
    }

    /// The model behind [`text_to_text`](Self::text_to_text), for helpers
    /// that take a `&dyn TextModel` (intent classification, exit checks).
    pub fn model(&self) -> &dyn TextModel {
        self.model.as_ref()
    }

    /// Record one exchange in the session history.
    pub fn remember(&self, user: impl Into<String>, assistant: impl Into<String>) {
        let mut history = self.lock_history();
        history.push(Message::user(user));
        history.push(Message::assistant(assistant));
    }

    /// Snapshot of the session history, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.lock_history().clone()
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<Message>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- Host services -------------------------------------------------------

    pub fn storage(&self) -> &dyn FileStorage {
        self.storage.as_ref()
    }

    /// Shared handle, for helpers that outlive a borrow (line logs).
    pub fn storage_handle(&self) -> Arc<dyn FileStorage> {
        Arc::clone(&self.storage)
    }

    pub fn tasks(&self) -> &SessionTasks {
        &self.tasks
    }

    /// Managed sleep; fails once the session is closed.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        Ok(self.tasks.sleep(duration).await?)
    }

    pub fn trigger_transcription(&self) -> &str {
        &self.trigger
    }

    /// Hand control back to the host.  Only the first call has an effect.
    pub fn resume_normal_flow(&self) {
        if self.resume.resume() {
            debug!(session = %self.tasks.session(), "normal flow resumed");
        }
    }

    pub fn has_resumed(&self) -> bool {
        self.resume.has_resumed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedModel, ScriptedSpeech};
    use ability_store::MemoryStorage;

    fn worker(speech: &ScriptedSpeech, model: &ScriptedModel) -> Worker {
        Worker::new(
            Arc::new(speech.clone()),
            Arc::new(model.clone()),
            Arc::new(MemoryStorage::new()),
        )
    }

    #[test]
    fn guard_resumes_once() {
        let counter = ResumeCounter::new();
        let guard = counter.guard();
        assert!(guard.resume());
        assert!(!guard.resume());
        drop(guard);
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn dropped_guard_resumes() {
        let counter = ResumeCounter::new();
        drop(counter.guard());
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test]
    async fn io_loop_speaks_then_listens() {
        let speech = ScriptedSpeech::new(["  add milk  "]);
        let model = ScriptedModel::new();
        let worker = worker(&speech, &model);

        let heard = worker.run_io_loop("What would you like?").await.unwrap();
        assert_eq!(heard, "add milk");
        assert_eq!(speech.spoken(), vec!["What would you like?".to_string()]);
    }

    #[tokio::test]
    async fn worker_resume_is_idempotent() {
        let counter = ResumeCounter::new();
        let speech = ScriptedSpeech::new(Vec::<String>::new());
        let model = ScriptedModel::new();
        let worker = worker(&speech, &model).with_resume(counter.guard());

        assert!(!worker.has_resumed());
        worker.resume_normal_flow();
        worker.resume_normal_flow();
        assert!(worker.has_resumed());
        drop(worker);
        assert_eq!(counter.count(), 1);
    }

    #[tokio::test]
    async fn history_accumulates() {
        let speech = ScriptedSpeech::new(Vec::<String>::new());
        let model = ScriptedModel::new();
        let worker = worker(&speech, &model);
        worker.remember("add milk", "Added milk.");
        let history = worker.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Added milk.");
    }

    #[tokio::test]
    async fn sleep_fails_after_close() {
        let speech = ScriptedSpeech::new(Vec::<String>::new());
        let model = ScriptedModel::new();
        let worker = worker(&speech, &model);
        worker.tasks().close();
        let err = worker.sleep(Duration::from_millis(10)).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
