//! Exit detection.
//!
//! Three tiers run on cleaned input (lowercased, punctuation removed except
//! apostrophes):
//!
//! 1. **Force phrases** match anywhere in the text ("close grocery list").
//! 2. **Commands** match as whole words anywhere ("please stop").
//! 3. **Responses** must be the whole utterance or its opening words
//!    ("no thanks", "done for now"), so "no milk" is still an exit but
//!    "I have no milk" is not.
//!
//! Abilities waiting for an answer where "no" or "done" are legitimate use
//! [`ExitDetector::is_hard_exit`], which skips tier 3.

use ability_agent::TextModel;
use regex::Regex;
use tracing::{debug, warn};

const DEFAULT_COMMANDS: &[&str] = &["stop", "exit", "quit", "cancel", "leave"];

const DEFAULT_RESPONSES: &[&str] = &[
    "no",
    "nope",
    "done",
    "bye",
    "goodbye",
    "thanks",
    "thank you",
    "no thanks",
    "nothing else",
    "all good",
    "i'm good",
    "that's all",
    "that's it",
    "i'm done",
    "we're done",
];

/// Inputs longer than this are never sent to the model for an exit check.
const MODEL_CHECK_MAX_WORDS: usize = 4;

/// Lowercase, trim, and drop everything but word characters, whitespace,
/// and apostrophes.  Curly apostrophes are folded to `'`.
pub fn clean_input(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('\u{2019}', "'");
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '\'')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Which tier matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    ForcePhrase(String),
    Command(String),
    Response(String),
    /// The model judged a short utterance to be a goodbye.
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCheck {
    NotExit,
    Exit(ExitReason),
}

impl ExitCheck {
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit(_))
    }
}

/// `(?:^|\s)phrase(?:$|\s)` over cleaned text.
pub(crate) fn word_pattern(phrase: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?:^|\s){}(?:$|\s)", regex::escape(phrase)))
}

/// A command word with its boundary pattern, compiled once.
#[derive(Debug, Clone)]
struct CommandWord {
    word: String,
    pattern: Regex,
}

fn compile_commands(words: Vec<String>) -> Vec<CommandWord> {
    words
        .into_iter()
        .filter_map(|word| match word_pattern(&word) {
            Ok(pattern) => Some(CommandWord { word, pattern }),
            Err(e) => {
                warn!(command = %word, error = %e, "exit command rejected");
                None
            }
        })
        .collect()
}

/// Keyword exit detector, customisable per ability.
#[derive(Debug, Clone)]
pub struct ExitDetector {
    force_phrases: Vec<String>,
    commands: Vec<CommandWord>,
    responses: Vec<String>,
}

impl Default for ExitDetector {
    fn default() -> Self {
        Self {
            force_phrases: Vec::new(),
            commands: compile_commands(cleaned_list(DEFAULT_COMMANDS.iter().copied())),
            responses: DEFAULT_RESPONSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn cleaned_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| clean_input(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

impl ExitDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tier-2 command words.
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.commands = compile_commands(cleaned_list(commands));
        self
    }

    /// Replace the tier-3 responses.
    pub fn with_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.responses = cleaned_list(responses);
        self
    }

    /// Replace the tier-1 force phrases.
    pub fn with_force_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.force_phrases = cleaned_list(phrases);
        self
    }

    /// Run all three tiers.
    pub fn check(&self, text: &str) -> ExitCheck {
        let cleaned = clean_input(text);
        if cleaned.is_empty() {
            return ExitCheck::NotExit;
        }
        if let Some(reason) = self.hard_tiers(&cleaned) {
            return ExitCheck::Exit(reason);
        }
        if let Some(resp) = self
            .responses
            .iter()
            .find(|r| cleaned == **r || cleaned.starts_with(&format!("{r} ")))
        {
            return ExitCheck::Exit(ExitReason::Response(resp.clone()));
        }
        ExitCheck::NotExit
    }

    pub fn is_exit(&self, text: &str) -> bool {
        self.check(text).is_exit()
    }

    /// Tiers 1 and 2 only.
    pub fn is_hard_exit(&self, text: &str) -> bool {
        let cleaned = clean_input(text);
        !cleaned.is_empty() && self.hard_tiers(&cleaned).is_some()
    }

    /// Keyword tiers, then a yes/no question to the model for short inputs
    /// the keywords did not catch.  A model failure means "not an exit".
    pub async fn is_exit_with_model(&self, text: &str, model: &dyn TextModel) -> ExitCheck {
        let check = self.check(text);
        if check.is_exit() {
            return check;
        }
        let cleaned = clean_input(text);
        let words = cleaned.split_whitespace().count();
        if words == 0 || words > MODEL_CHECK_MAX_WORDS {
            return ExitCheck::NotExit;
        }

        let prompt = format!(
            "Does this message mean the user wants to END the conversation? \
             Reply with ONLY 'yes' or 'no'.\n\nMessage: \"{cleaned}\""
        );
        match model.generate(&prompt, &[], None).await {
            Ok(answer) if answer.trim().to_lowercase().starts_with("yes") => {
                debug!(text = %cleaned, "model judged utterance an exit");
                ExitCheck::Exit(ExitReason::Model)
            }
            Ok(_) => ExitCheck::NotExit,
            Err(e) => {
                warn!(error = %e, "exit check call failed, continuing");
                ExitCheck::NotExit
            }
        }
    }

    fn hard_tiers(&self, cleaned: &str) -> Option<ExitReason> {
        if let Some(phrase) = self.force_phrases.iter().find(|p| cleaned.contains(p.as_str())) {
            return Some(ExitReason::ForcePhrase(phrase.clone()));
        }
        self.commands
            .iter()
            .find(|cmd| cmd.pattern.is_match(cleaned))
            .map(|cmd| ExitReason::Command(cmd.word.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
