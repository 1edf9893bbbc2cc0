//! Yes/no answers.

use crate::exit::clean_input;

const YES: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "ok", "okay", "correct", "absolutely", "definitely",
    "please",
];
const NO: &[&str] = &["no", "nope", "nah", "cancel", "don't", "dont", "negative"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Unclear,
}

/// Classify a reply by its first word.
pub fn parse_confirmation(text: &str) -> Confirmation {
    let cleaned = clean_input(text);
    match cleaned.split_whitespace().next() {
        Some(word) if YES.contains(&word) => Confirmation::Yes,
        Some(word) if NO.contains(&word) => Confirmation::No,
        _ => Confirmation::Unclear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_word_decides() {
        assert_eq!(parse_confirmation("Yes, save it."), Confirmation::Yes);
        assert_eq!(parse_confirmation("okay"), Confirmation::Yes);
        assert_eq!(parse_confirmation("Nope!"), Confirmation::No);
        assert_eq!(parse_confirmation("don't do that"), Confirmation::No);
        assert_eq!(parse_confirmation("maybe later"), Confirmation::Unclear);
        assert_eq!(parse_confirmation(""), Confirmation::Unclear);
    }
}
