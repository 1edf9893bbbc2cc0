//! The generic session loop every conversational ability runs in.
//!
//! An ability supplies a [`Conversation`]: its greeting, its exit words,
//! and a turn handler.  [`run_session`] owns the listen loop, idle
//! detection, exit detection, the turn ceiling, and error policy:
//!
//! - recoverable handler errors are logged and answered with the
//!   conversation's apology;
//! - fatal errors (speech gone, session closed) end the loop and propagate.
//!
//! `run_session` never resumes the host's normal flow.  That is the job of
//! [`crate::host::run_ability`], so the resume happens on every exit path.

use ability_agent::Worker;
use ability_intent::{ExitDetector, IdleAction, IdleTracker, is_substantive};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Spoken once the user has been quiet for the idle threshold.
pub const IDLE_WARNING: &str = "Still here if you need me. Otherwise I'll close.";

pub const DEFAULT_CLOSING: &str = "Goodbye!";
pub const DEFAULT_APOLOGY: &str = "Sorry, something went wrong. Let's try that again.";
pub const DEFAULT_MAX_TURNS: usize = 10;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What the loop does after a handled turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    /// Finish the session.  The farewell, if any, replaces the closing line.
    End { farewell: Option<String> },
}

impl TurnOutcome {
    pub fn end() -> Self {
        Self::End { farewell: None }
    }

    pub fn end_with(farewell: impl Into<String>) -> Self {
        Self::End {
            farewell: Some(farewell.into()),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    ExitPhrase,
    Idle,
    TurnLimit,
    /// The handler ended the session itself.
    Finished,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ExitPhrase => "exit_phrase",
            Self::Idle => "idle",
            Self::TurnLimit => "turn_limit",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Listens performed, including silent ones.
    pub turns: usize,
    pub reason: EndReason,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Per-invocation ability state plus its turn handler.
///
/// A fresh value is built for every session, so plain fields are the
/// session state.
#[async_trait]
pub trait Conversation: Send {
    fn greeting(&self) -> String;

    fn closing(&self) -> String {
        DEFAULT_CLOSING.to_string()
    }

    fn apology(&self) -> String {
        DEFAULT_APOLOGY.to_string()
    }

    fn max_turns(&self) -> usize {
        DEFAULT_MAX_TURNS
    }

    fn idle_threshold(&self) -> u32 {
        ability_intent::idle::DEFAULT_IDLE_THRESHOLD
    }

    fn exit_detector(&self) -> ExitDetector {
        ExitDetector::new()
    }

    /// While true only commands and force phrases end the session, so
    /// "no" and "done" can be answers.
    fn awaiting_answer(&self) -> bool {
        false
    }

    /// An utterance to handle in place of the greeting, e.g. a city named
    /// in the trigger phrase.  Called once, after `on_start`.
    fn opening_turn(&mut self) -> Option<String> {
        None
    }

    /// Load persisted state.
    async fn on_start(&mut self, _worker: &Worker) -> Result<()> {
        Ok(())
    }

    /// Persist state.  Runs before the closing line is spoken.
    async fn on_end(&mut self, _worker: &Worker, _reason: EndReason) -> Result<()> {
        Ok(())
    }

    async fn handle(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome>;
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

enum Step {
    Next,
    Stop(EndReason, Option<String>),
}

/// Drive `conv` until it ends.  See the module docs for the policy.
pub async fn run_session<C>(conv: &mut C, worker: &Worker) -> Result<SessionSummary>
where
    C: Conversation + ?Sized,
{
    let session = worker.tasks().session().to_string();

    if let Err(e) = conv.on_start(worker).await {
        if e.is_fatal() {
            return Err(e);
        }
        warn!(session = %session, error = %e, "session start hook failed, continuing");
    }

    let exit = conv.exit_detector();
    let mut idle = IdleTracker::new(conv.idle_threshold());
    let max_turns = conv.max_turns();
    let mut turns = 0usize;

    let opening = match conv.opening_turn() {
        Some(utterance) => handle_turn(conv, worker, &utterance).await?,
        None => {
            worker.speak(&conv.greeting()).await?;
            Step::Next
        }
    };

    let (reason, farewell) = match opening {
        Step::Stop(reason, farewell) => (reason, farewell),
        Step::Next => loop {
            if turns >= max_turns {
                break (EndReason::TurnLimit, None);
            }
            let heard = worker.user_response().await?;
            turns += 1;

            match idle.observe(&heard) {
                IdleAction::Exit => break (EndReason::Idle, None),
                IdleAction::Warn => {
                    worker.speak(IDLE_WARNING).await?;
                    continue;
                }
                IdleAction::Continue if !is_substantive(&heard) => continue,
                IdleAction::Continue => {}
            }

            let exiting = if conv.awaiting_answer() {
                exit.is_hard_exit(&heard)
            } else {
                exit.is_exit(&heard)
            };
            if exiting {
                debug!(session = %session, turn = turns, heard = %heard, "exit phrase");
                break (EndReason::ExitPhrase, None);
            }

            if let Step::Stop(reason, farewell) = handle_turn(conv, worker, &heard).await? {
                break (reason, farewell);
            }
        },
    };

    if let Err(e) = conv.on_end(worker, reason).await {
        if e.is_fatal() {
            return Err(e);
        }
        warn!(session = %session, error = %e, "session end hook failed");
    }

    match farewell {
        Some(farewell) => worker.speak(&farewell).await?,
        None if reason == EndReason::Finished => {}
        None => worker.speak(&conv.closing()).await?,
    }

    info!(session = %session, turns, reason = %reason, "session ended");
    Ok(SessionSummary { turns, reason })
}

async fn handle_turn<C>(conv: &mut C, worker: &Worker, utterance: &str) -> Result<Step>
where
    C: Conversation + ?Sized,
{
    match conv.handle(worker, utterance).await {
        Ok(TurnOutcome::Continue) => Ok(Step::Next),
        Ok(TurnOutcome::End { farewell }) => Ok(Step::Stop(EndReason::Finished, farewell)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(session = %worker.tasks().session(), error = %e, "turn failed");
            worker.speak(&conv.apology()).await?;
            Ok(Step::Next)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
