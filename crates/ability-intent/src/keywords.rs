//! Keyword fast path.
//!
//! Cheap phrase matching tried before the model, in row order.  The first
//! row with a phrase on word boundaries wins.

use regex::Regex;

use crate::error::{IntentError, Result};
use crate::exit::{clean_input, word_pattern};

#[derive(Debug, Clone)]
struct Row<L> {
    label: L,
    phrases: Vec<(String, Regex)>,
}

/// Ordered `(label, phrases)` table.
#[derive(Debug, Clone)]
pub struct KeywordTable<L> {
    rows: Vec<Row<L>>,
}

impl<L> Default for KeywordTable<L> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

/// A keyword hit and the text that follows the phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch<L> {
    pub label: L,
    pub phrase: String,
    /// Cleaned text after the matched phrase, trimmed.
    pub remainder: String,
}

impl<L: Clone> KeywordTable<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.  Earlier rows take priority.
    pub fn row<I, S>(mut self, label: L, phrases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for phrase in phrases {
            let phrase = clean_input(phrase.as_ref());
            if phrase.is_empty() {
                continue;
            }
            let re = word_pattern(&phrase).map_err(|e| IntentError::InvalidKeyword {
                phrase: phrase.clone(),
                reason: e.to_string(),
            })?;
            compiled.push((phrase, re));
        }
        self.rows.push(Row {
            label,
            phrases: compiled,
        });
        Ok(self)
    }

    pub fn match_first(&self, text: &str) -> Option<L> {
        self.strip_matched(text).map(|m| m.label)
    }

    pub fn strip_matched(&self, text: &str) -> Option<KeywordMatch<L>> {
        let cleaned = clean_input(text);
        for row in &self.rows {
            for (phrase, re) in &row.phrases {
                if let Some(found) = re.find(&cleaned) {
                    return Some(KeywordMatch {
                        label: row.label.clone(),
                        phrase: phrase.clone(),
                        remainder: cleaned[found.end()..].trim().to_string(),
                    });
                }
            }
        }
        None
    }
}
