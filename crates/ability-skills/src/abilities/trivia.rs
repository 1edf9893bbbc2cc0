//! Open Trivia: model-generated multiple-choice questions with a running
//! score.

use std::sync::LazyLock;

use ability_agent::Worker;
use ability_intent::{
    Confirmation, ExitDetector, IntentClassifier, IntentRecord, IntentSchema, clean_input,
    parse_confirmation, parse_json_object,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::manifest::AbilityManifest;
use crate::session::{Conversation, TurnOutcome};

pub const ID: &str = "trivia";

const GREETING: &str = "Welcome to Open Trivia. Ready to test your knowledge?";
const ANOTHER: &str = "Would you like another question? Please say yes or no.";
const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

const EXIT_RESPONSES: [&str; 8] = [
    "bye",
    "goodbye",
    "done",
    "i'm done",
    "we're done",
    "that's all",
    "that's it",
    "nothing else",
];

const QUESTION_PROMPT: &str = r#"Generate a random multiple choice trivia question.

Return JSON in this exact format:
{"question": "...", "options": {"A": "...", "B": "...", "C": "...", "D": "..."}, "correct_answer": "B", "explanation": "Short explanation"}

Rules:
- The correct_answer must be one of A, B, C, or D.
- Keep the explanation to one sentence.
- Do not include extra text outside JSON."#;

const INTENT_SCHEMA: &str = r#"{"intent": "quit|repeat|change_question|answer|unknown"}
The user was just asked a trivia question. "answer" means they are trying to answer it."#;

static SPOKEN_LETTER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:i think|i'll go with|i will go with|go with|my answer is|it's|it is|the answer is|answer|option|letter)\s+)*([abcd])$",
    )
    .ok()
});

pub fn manifest() -> AbilityManifest {
    AbilityManifest::new(ID, ["trivia", "quiz me", "open trivia"])
        .with_description("Multiple-choice trivia with a score.")
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub question: String,
    /// Options A to D, in order.
    pub options: [String; 4],
    pub correct: char,
    pub explanation: String,
}

impl Question {
    pub fn option(&self, letter: char) -> Option<&str> {
        LETTERS
            .iter()
            .position(|l| *l == letter)
            .map(|i| self.options[i].as_str())
    }

    pub fn spoken(&self) -> String {
        let mut text = self.question.trim().to_string();
        for (letter, option) in LETTERS.iter().zip(&self.options) {
            text.push_str(&format!(" {letter}. {}.", option.trim_end_matches('.')));
        }
        text.push_str(" Please say A, B, C, or D.");
        text
    }
}

/// Validate model output as a question.  `None` on any defect.
pub fn parse_question(raw: &str) -> Option<Question> {
    let map = parse_json_object(raw).ok()?;
    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let question = text(map.get("question"))?;
    let explanation = text(map.get("explanation")).unwrap_or_default();
    let options_map = map.get("options")?.as_object()?;
    let mut options: [String; 4] = Default::default();
    for (slot, letter) in options.iter_mut().zip(LETTERS) {
        *slot = text(options_map.get(&letter.to_string()))?;
    }
    let correct = map
        .get("correct_answer")?
        .as_str()?
        .trim()
        .chars()
        .next()?
        .to_ascii_uppercase();
    if !LETTERS.contains(&correct) {
        return None;
    }

    Some(Question {
        question,
        options,
        correct,
        explanation,
    })
}

/// Map an answer without the model: a spoken letter, or the text of
/// exactly one option.
pub fn match_answer(question: &Question, utterance: &str) -> Option<char> {
    let cleaned = clean_input(utterance);
    if let Some(caps) = SPOKEN_LETTER.as_ref().and_then(|re| re.captures(&cleaned)) {
        return caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase());
    }

    let hits: Vec<char> = LETTERS
        .iter()
        .zip(&question.options)
        .filter(|(_, option)| {
            let option = clean_input(option);
            !option.is_empty() && cleaned.contains(&option)
        })
        .map(|(letter, _)| *letter)
        .collect();
    match hits.as_slice() {
        [one] => Some(*one),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaIntent {
    Quit,
    Repeat,
    ChangeQuestion,
    Answer,
    Unknown,
}

impl IntentSchema for TriviaIntent {
    fn from_record(record: &IntentRecord) -> Option<Self> {
        match record.label.as_str() {
            "quit" => Some(Self::Quit),
            "repeat" => Some(Self::Repeat),
            "change_question" => Some(Self::ChangeQuestion),
            "answer" => Some(Self::Answer),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    fn fallback() -> Self {
        Self::Unknown
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Answering,
    Another { clarified: bool },
}

pub struct Trivia {
    phase: Phase,
    current: Option<Question>,
    asked: u32,
    right: u32,
    classifier: IntentClassifier,
}

impl Default for Trivia {
    fn default() -> Self {
        Self::new()
    }
}

impl Trivia {
    pub fn new() -> Self {
        Self {
            phase: Phase::Start,
            current: None,
            asked: 0,
            right: 0,
            classifier: IntentClassifier::new(INTENT_SCHEMA),
        }
    }

    pub fn score(&self) -> (u32, u32) {
        (self.right, self.asked)
    }

    /// `text`, followed by the score once a question has been answered.
    fn with_score(&self, text: &str) -> String {
        if self.asked == 0 {
            text.to_string()
        } else {
            format!("{text} You got {} of {} right.", self.right, self.asked)
        }
    }

    async fn generate(&self, worker: &Worker) -> Option<Question> {
        for attempt in 1..=2 {
            match worker.text_to_text(QUESTION_PROMPT).await {
                Ok(raw) => match parse_question(&raw) {
                    Some(question) => return Some(question),
                    None => warn!(attempt, "invalid trivia question from model"),
                },
                Err(e) => warn!(attempt, error = %e, "trivia question request failed"),
            }
        }
        None
    }

    async fn next_question(&mut self, worker: &Worker) -> Result<TurnOutcome> {
        let Some(question) = self.generate(worker).await else {
            let apology = "Sorry, I couldn't come up with a question right now.";
            return Ok(TurnOutcome::end_with(self.with_score(apology)));
        };
        worker.speak(&question.spoken()).await?;
        self.current = Some(question);
        self.phase = Phase::Answering;
        Ok(TurnOutcome::Continue)
    }

    async fn repeat(&self, worker: &Worker) -> Result<TurnOutcome> {
        if let Some(question) = &self.current {
            worker.speak(&question.spoken()).await?;
        }
        Ok(TurnOutcome::Continue)
    }

    async fn model_letter(
        &self,
        worker: &Worker,
        question: &Question,
        utterance: &str,
    ) -> Option<char> {
        let prompt = format!(
            "Question: {}\nA. {}\nB. {}\nC. {}\nD. {}\n\nThe player said: \"{}\"\n\n\
             Which option did they choose? Reply with ONLY one letter A, B, C, or D, \
             or ? if unclear.",
            question.question,
            question.options[0],
            question.options[1],
            question.options[2],
            question.options[3],
            utterance.trim()
        );
        match worker.text_to_text(&prompt).await {
            Ok(reply) => reply
                .trim()
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .filter(|c| LETTERS.contains(c)),
            Err(e) => {
                warn!(error = %e, "answer interpretation failed");
                None
            }
        }
    }

    async fn on_answer(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome> {
        let Some(question) = self.current.clone() else {
            return self.next_question(worker).await;
        };

        let mut letter = match_answer(&question, utterance);
        if letter.is_none() {
            let intent: TriviaIntent = self
                .classifier
                .classify(worker.model(), utterance, Some(&question.question), &[])
                .await;
            debug!(intent = ?intent, "trivia intent");
            match intent {
                TriviaIntent::Quit => {
                    let farewell = self.with_score("Alright, we'll stop here.");
                    return Ok(TurnOutcome::end_with(farewell));
                }
                TriviaIntent::Repeat => return self.repeat(worker).await,
                TriviaIntent::ChangeQuestion => {
                    worker.speak("Sure, let's try a different one.").await?;
                    return self.next_question(worker).await;
                }
                TriviaIntent::Answer | TriviaIntent::Unknown => {
                    letter = self.model_letter(worker, &question, utterance).await;
                }
            }
        }

        let Some(letter) = letter else {
            worker
                .speak("I didn't quite catch that. Let's try that question again.")
                .await?;
            return self.repeat(worker).await;
        };

        self.asked += 1;
        let is_right = letter == question.correct;
        let feedback = if is_right {
            self.right += 1;
            "That's right!".to_string()
        } else {
            format!(
                "Not quite. The answer was {}. {}.",
                question.correct,
                question
                    .option(question.correct)
                    .unwrap_or_default()
                    .trim_end_matches('.')
            )
        };
        let feedback = if question.explanation.is_empty() {
            feedback
        } else {
            format!("{feedback} {}", question.explanation)
        };
        info!(is_right, right = self.right, asked = self.asked, "trivia answer");

        worker.speak(&feedback).await?;
        worker.speak(ANOTHER).await?;
        self.phase = Phase::Another { clarified: false };
        Ok(TurnOutcome::Continue)
    }
}

#[async_trait]
impl Conversation for Trivia {
    fn greeting(&self) -> String {
        GREETING.to_string()
    }

    fn closing(&self) -> String {
        self.with_score("Thanks for playing Open Trivia.")
    }

    fn apology(&self) -> String {
        "Sorry, something went wrong with that question.".to_string()
    }

    fn max_turns(&self) -> usize {
        40
    }

    /// "no", "nope" and "thanks" are answers here, never exits.
    fn exit_detector(&self) -> ExitDetector {
        ExitDetector::new().with_responses(EXIT_RESPONSES)
    }

    async fn handle(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome> {
        match self.phase {
            Phase::Start => match parse_confirmation(utterance) {
                Confirmation::No => Ok(TurnOutcome::end_with("No problem. Maybe next time.")),
                _ => self.next_question(worker).await,
            },
            Phase::Answering => self.on_answer(worker, utterance).await,
            Phase::Another { clarified } => match parse_confirmation(utterance) {
                Confirmation::Yes => self.next_question(worker).await,
                Confirmation::No => Ok(TurnOutcome::end_with(self.closing())),
                Confirmation::Unclear if !clarified => {
                    self.phase = Phase::Another { clarified: true };
                    worker.speak("I just need a yes or no.").await?;
                    Ok(TurnOutcome::Continue)
                }
                Confirmation::Unclear => Ok(TurnOutcome::end_with(
                    self.with_score("Alright, we'll stop here."),
                )),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
