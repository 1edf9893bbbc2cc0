//! Idle detection: two quiet turns earn a warning, one more ends the
//! session.

use crate::exit::clean_input;

/// Consecutive idle turns before the warning.
pub const DEFAULT_IDLE_THRESHOLD: u32 = 2;

const FILLER_WORDS: &[&str] = &["um", "uh", "hmm", "hm", "erm", "er", "mm", "uhh", "umm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    IdleWarned,
    Exited,
}

/// What the session loop should do after an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Carry on.  For an idle turn below the threshold, listen again quietly.
    Continue,
    /// Speak the idle warning and listen again.
    Warn,
    /// End the session.
    Exit,
}

/// Whether `utterance` carries any content beyond silence and filler.
pub fn is_substantive(utterance: &str) -> bool {
    clean_input(utterance)
        .split_whitespace()
        .any(|w| !FILLER_WORDS.contains(&w))
}

#[derive(Debug, Clone)]
pub struct IdleTracker {
    threshold: u32,
    idle_turns: u32,
    state: IdleState,
}

impl Default for IdleTracker {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD)
    }
}

impl IdleTracker {
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            idle_turns: 0,
            state: IdleState::Active,
        }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn idle_turns(&self) -> u32 {
        self.idle_turns
    }

    pub fn observe(&mut self, utterance: &str) -> IdleAction {
        if self.state == IdleState::Exited {
            return IdleAction::Exit;
        }

        if is_substantive(utterance) {
            self.idle_turns = 0;
            self.state = IdleState::Active;
            return IdleAction::Continue;
        }

        self.idle_turns += 1;
        match self.state {
            IdleState::IdleWarned => {
                self.state = IdleState::Exited;
                IdleAction::Exit
            }
            IdleState::Active if self.idle_turns >= self.threshold => {
                self.state = IdleState::IdleWarned;
                IdleAction::Warn
            }
            _ => IdleAction::Continue,
        }
    }

    pub fn reset(&mut self) {
        self.idle_turns = 0;
        self.state = IdleState::Active;
    }
}
