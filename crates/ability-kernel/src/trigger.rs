//! Hotword trigger gate.
//!
//! The gate decides which ability, if any, a spoken utterance should wake.
//! Resolution is tiered:
//!
//! | Tier | Technique | Result |
//! |------|-----------|--------|
//! | 1 | Hotword phrases via [`aho_corasick`], matched on word boundaries | [`TriggerMatch::Hotword`] |
//! | 2 | Compiled [`regex`] triggers with named captures | [`TriggerMatch::Pattern`] |
//! | 3 | Nothing matched | [`TriggerMatch::NoMatch`] |
//!
//! # Example
//!
//! ```rust
//! # use ability_kernel::trigger::{TriggerGate, TriggerMatch};
//! let mut gate = TriggerGate::new();
//! gate.add_hotwords(["grocery list", "shopping list"], "grocery-list").unwrap();
//! gate.add_pattern(r"weather in (?P<city>[a-z ]+)", "weather").unwrap();
//!
//! let result = gate.resolve("Open my Shopping List please");
//! assert_eq!(result.ability(), Some("grocery-list"));
//! ```

use std::collections::{BTreeSet, HashMap};

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The outcome of resolving an utterance against the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMatch {
    /// A registered hotword phrase occurs in the utterance.
    Hotword {
        /// Ability that owns the phrase.
        ability: String,
        /// The normalised phrase that matched.
        phrase: String,
    },

    /// A regex trigger matched.  Named captures are returned as key/value
    /// pairs so the ability can skip asking for them.
    Pattern {
        ability: String,
        captures: HashMap<String, String>,
    },

    /// Nothing matched; the host keeps the utterance for itself.
    NoMatch { utterance: String },
}

impl TriggerMatch {
    /// The ability id for matching variants.
    pub fn ability(&self) -> Option<&str> {
        match self {
            Self::Hotword { ability, .. } | Self::Pattern { ability, .. } => Some(ability),
            Self::NoMatch { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct PatternTrigger {
    ability: String,
    compiled: Regex,
}

// ---------------------------------------------------------------------------
// TriggerGate
// ---------------------------------------------------------------------------

/// Maps spoken utterances to ability ids.
///
/// The automaton is rebuilt whenever hotwords are added, so resolution only
/// needs a shared reference.
#[derive(Debug, Default)]
pub struct TriggerGate {
    /// Normalised phrase and owning ability, in registration order.
    hotwords: Vec<(String, String)>,
    automaton: Option<AhoCorasick>,
    patterns: Vec<PatternTrigger>,
}

impl TriggerGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single hotword phrase for `ability`.
    pub fn add_hotword(&mut self, phrase: &str, ability: impl Into<String>) -> Result<()> {
        self.add_hotwords([phrase], ability)
    }

    /// Register several hotword phrases for `ability`, rebuilding the
    /// automaton once.
    ///
    /// Phrases are lowercased and whitespace-collapsed.  Empty phrases are
    /// rejected.
    pub fn add_hotwords<'a, I>(&mut self, phrases: I, ability: impl Into<String>) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ability = ability.into();
        let mut added = 0usize;

        for phrase in phrases {
            let normalised = normalise(phrase);
            if normalised.is_empty() {
                return Err(KernelError::EmptyHotword {
                    ability_id: ability.clone(),
                });
            }
            tracing::debug!(phrase = %normalised, ability = %ability, "hotword added");
            self.hotwords.push((normalised, ability.clone()));
            added += 1;
        }

        if added > 0 {
            self.rebuild();
        }
        Ok(())
    }

    /// Register a regex trigger.  The pattern is matched against the
    /// normalised (lowercase) utterance.
    pub fn add_pattern(&mut self, pattern: &str, ability: impl Into<String>) -> Result<()> {
        let compiled = Regex::new(pattern).map_err(|e| KernelError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let ability = ability.into();
        tracing::debug!(pattern = %pattern, ability = %ability, "trigger pattern added");
        self.patterns.push(PatternTrigger { ability, compiled });
        Ok(())
    }

    /// Drop every hotword and pattern registered for `ability`.
    pub fn remove_ability(&mut self, ability: &str) {
        self.hotwords.retain(|(_, owner)| owner != ability);
        self.patterns.retain(|p| p.ability != ability);
        self.rebuild();
    }

    /// Resolve an utterance.
    pub fn resolve(&self, utterance: &str) -> TriggerMatch {
        let normalised = normalise(utterance);

        if let Some((phrase, ability)) = self.longest_hotword(&normalised) {
            tracing::debug!(utterance = %utterance, ability = %ability, "hotword triggered");
            return TriggerMatch::Hotword {
                ability: ability.to_string(),
                phrase: phrase.to_string(),
            };
        }

        for trigger in &self.patterns {
            if let Some(caps) = trigger.compiled.captures(&normalised) {
                let captures = trigger
                    .compiled
                    .capture_names()
                    .flatten()
                    .filter_map(|name| {
                        caps.name(name)
                            .map(|m| (name.to_string(), m.as_str().trim().to_string()))
                    })
                    .collect();
                tracing::debug!(utterance = %utterance, ability = %trigger.ability, "pattern triggered");
                return TriggerMatch::Pattern {
                    ability: trigger.ability.clone(),
                    captures,
                };
            }
        }

        TriggerMatch::NoMatch {
            utterance: utterance.to_string(),
        }
    }

    /// Distinct ability ids known to the gate, sorted.
    pub fn abilities(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .hotwords
            .iter()
            .map(|(_, a)| a.as_str())
            .chain(self.patterns.iter().map(|p| p.ability.as_str()))
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Number of registered hotword phrases.
    pub fn hotword_count(&self) -> usize {
        self.hotwords.len()
    }

    /// Number of registered regex triggers.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    // -- Private helpers ----------------------------------------------------

    fn rebuild(&mut self) {
        if self.hotwords.is_empty() {
            self.automaton = None;
            return;
        }

        let phrases: Vec<&str> = self.hotwords.iter().map(|(p, _)| p.as_str()).collect();
        match AhoCorasick::new(&phrases) {
            Ok(ac) => {
                tracing::trace!(count = phrases.len(), "hotword automaton rebuilt");
                self.automaton = Some(ac);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to build hotword automaton");
                self.automaton = None;
            }
        }
    }

    /// Longest phrase that occurs on word boundaries.  Ties go to the phrase
    /// registered first.
    fn longest_hotword(&self, text: &str) -> Option<(&str, &str)> {
        let ac = self.automaton.as_ref()?;
        let mut best: Option<(usize, usize)> = None;

        for mat in ac.find_overlapping_iter(text) {
            if !on_word_boundary(text, mat.start(), mat.end()) {
                continue;
            }
            let len = mat.end() - mat.start();
            let idx = mat.pattern().as_usize();
            let better = match best {
                None => true,
                Some((best_idx, best_len)) => len > best_len || (len == best_len && idx < best_idx),
            };
            if better {
                best = Some((idx, len));
            }
        }

        best.map(|(idx, _)| {
            let (phrase, ability) = &self.hotwords[idx];
            (phrase.as_str(), ability.as_str())
        })
    }
}

/// Lowercase and collapse runs of whitespace.
fn normalise(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotword_is_case_insensitive() {
        let mut gate = TriggerGate::new();
        gate.add_hotword("Grocery List", "grocery-list").unwrap();

        match gate.resolve("open my GROCERY list") {
            TriggerMatch::Hotword { ability, phrase } => {
                assert_eq!(ability, "grocery-list");
                assert_eq!(phrase, "grocery list");
            }
            other => panic!("expected Hotword, got {other:?}"),
        }
    }

    #[test]
    fn hotword_requires_word_boundaries() {
        let mut gate = TriggerGate::new();
        gate.add_hotword("weather", "weather").unwrap();

        assert!(matches!(
            gate.resolve("is this weatherproof"),
            TriggerMatch::NoMatch { .. }
        ));
        assert_eq!(gate.resolve("what's the weather?").ability(), Some("weather"));
    }

    #[test]
    fn longest_hotword_wins() {
        let mut gate = TriggerGate::new();
        gate.add_hotword("list", "generic").unwrap();
        gate.add_hotword("shopping list", "grocery-list").unwrap();

        assert_eq!(
            gate.resolve("read my shopping list").ability(),
            Some("grocery-list")
        );
    }

    #[test]
    fn pattern_captures_are_trimmed() {
        let mut gate = TriggerGate::new();
        gate.add_pattern(r"forecast for (?P<city>[a-z ]+)", "weather")
            .unwrap();

        match gate.resolve("Forecast for  New York ") {
            TriggerMatch::Pattern { ability, captures } => {
                assert_eq!(ability, "weather");
                assert_eq!(captures.get("city").map(String::as_str), Some("new york"));
            }
            other => panic!("expected Pattern, got {other:?}"),
        }
    }

    #[test]
    fn hotword_takes_precedence_over_pattern() {
        let mut gate = TriggerGate::new();
        gate.add_pattern(r"convert (?P<what>.+)", "generic").unwrap();
        gate.add_hotword("convert", "unit-converter").unwrap();

        assert!(matches!(
            gate.resolve("convert ten miles"),
            TriggerMatch::Hotword { .. }
        ));
    }

    #[test]
    fn empty_hotword_and_bad_regex_are_rejected() {
        let mut gate = TriggerGate::new();
        assert!(gate.add_hotword("   ", "x").is_err());
        assert!(gate.add_pattern("[unclosed(", "x").is_err());
        assert_eq!(gate.hotword_count(), 0);
        assert_eq!(gate.pattern_count(), 0);
    }

    #[test]
    fn remove_ability_drops_its_triggers() {
        let mut gate = TriggerGate::new();
        gate.add_hotwords(["trivia", "quiz me"], "trivia").unwrap();
        gate.add_hotword("journal", "voice-journal").unwrap();
        assert_eq!(gate.abilities(), vec!["trivia", "voice-journal"]);

        gate.remove_ability("trivia");
        assert_eq!(gate.hotword_count(), 1);
        assert!(matches!(gate.resolve("quiz me"), TriggerMatch::NoMatch { .. }));
        assert_eq!(gate.resolve("journal").ability(), Some("voice-journal"));
    }
}
