//! Deterministic stand-ins for speech and the text model.
//!
//! Every crate above this one drives sessions through these doubles, so
//! conversations can be asserted line by line without a microphone or a
//! network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::host::Speech;
use crate::llm::Message;
use crate::model::TextModel;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SpeechState {
    inputs: VecDeque<String>,
    spoken: Vec<String>,
    listens: usize,
}

/// Plays back queued utterances and records everything spoken.  Clones
/// share state.
#[derive(Clone, Default)]
pub struct ScriptedSpeech {
    state: Arc<Mutex<SpeechState>>,
    hang_when_exhausted: bool,
    fail_on_speak: bool,
}

impl ScriptedSpeech {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = SpeechState {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..SpeechState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            ..Self::default()
        }
    }

    /// Once the queue is empty, `user_response` never completes instead of
    /// returning silence.
    pub fn hang_when_exhausted(mut self) -> Self {
        self.hang_when_exhausted = true;
        self
    }

    /// Every `speak` fails, as if the audio device vanished.
    pub fn failing(mut self) -> Self {
        self.fail_on_speak = true;
        self
    }

    pub fn push(&self, input: impl Into<String>) {
        lock(&self.state).inputs.push_back(input.into());
    }

    /// Everything spoken so far, in order.
    pub fn spoken(&self) -> Vec<String> {
        lock(&self.state).spoken.clone()
    }

    pub fn last_spoken(&self) -> Option<String> {
        lock(&self.state).spoken.last().cloned()
    }

    /// Utterances not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.state).inputs.len()
    }

    /// How many times the session listened.
    pub fn listens(&self) -> usize {
        lock(&self.state).listens
    }
}

#[async_trait]
impl Speech for ScriptedSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        if self.fail_on_speak {
            return Err(AgentError::Speech {
                reason: "scripted speech failure".into(),
            });
        }
        lock(&self.state).spoken.push(text.to_string());
        Ok(())
    }

    async fn user_response(&self) -> Result<String> {
        let next = {
            let mut state = lock(&self.state);
            state.listens += 1;
            state.inputs.pop_front()
        };
        match next {
            Some(input) => Ok(input),
            None if self.hang_when_exhausted => std::future::pending().await,
            None => Ok(String::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ModelState {
    rules: Vec<(String, String)>,
    failures: Vec<String>,
    queue: VecDeque<String>,
    prompts: Vec<String>,
}

/// Answers prompts from matching rules, then from a FIFO of replies.
///
/// With no rule and an empty queue it fails like an unreachable provider.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    state: Arc<Mutex<ModelState>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` whenever the prompt contains `needle`
    /// (case-insensitive).  Rules are checked in insertion order and are
    /// never consumed.
    pub fn when(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        lock(&self.state)
            .rules
            .push((needle.into().to_lowercase(), reply.into()));
        self
    }

    /// Fail whenever the prompt contains `needle`.  Checked before rules.
    pub fn fail_when(self, needle: impl Into<String>) -> Self {
        lock(&self.state).failures.push(needle.into().to_lowercase());
        self
    }

    /// Queue a one-shot reply.
    pub fn reply(self, reply: impl Into<String>) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.state).queue.push_back(reply.into());
    }

    /// Wait this long before answering, to simulate a slow provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.state).prompts.clone()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn generate(
        &self,
        prompt: &str,
        _history: &[Message],
        _system_prompt: Option<&str>,
    ) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        state.prompts.push(prompt.to_string());
        let lowered = prompt.to_lowercase();

        if state.failures.iter().any(|n| lowered.contains(n.as_str())) {
            return Err(AgentError::LlmRequestFailed {
                reason: "scripted failure".into(),
            });
        }
        if let Some((_, reply)) = state.rules.iter().find(|(n, _)| lowered.contains(n.as_str())) {
            return Ok(reply.clone());
        }
        state
            .queue
            .pop_front()
            .ok_or_else(|| AgentError::LlmRequestFailed {
                reason: "no scripted reply".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
