//! Multi-turn slot filling.
//!
//! A [`PendingState`] remembers which slot the conversation is waiting on
//! and what has been collected so far.  It belongs to one session and is
//! cleared when the flow completes or is cancelled.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingState<S> {
    waiting_for: Option<S>,
    values: BTreeMap<String, String>,
}

impl<S> Default for PendingState<S> {
    fn default() -> Self {
        Self {
            waiting_for: None,
            values: BTreeMap::new(),
        }
    }
}

impl<S: PartialEq> PendingState<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `slot` on the next turn.  Collected values are kept.
    pub fn wait_for(&mut self, slot: S) {
        self.waiting_for = Some(slot);
    }

    pub fn waiting_for(&self) -> Option<&S> {
        self.waiting_for.as_ref()
    }

    pub fn is_waiting_for(&self, slot: &S) -> bool {
        self.waiting_for.as_ref() == Some(slot)
    }

    pub fn fill(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Finish the flow: hand back the collected values and clear everything.
    pub fn take_values(&mut self) -> BTreeMap<String, String> {
        self.waiting_for = None;
        std::mem::take(&mut self.values)
    }

    pub fn clear(&mut self) {
        self.waiting_for = None;
        self.values.clear();
    }

    /// Nothing pending and nothing collected.
    pub fn is_idle(&self) -> bool {
        self.waiting_for.is_none() && self.values.is_empty()
    }
}
