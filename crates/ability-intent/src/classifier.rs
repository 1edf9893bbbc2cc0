//! LLM-backed intent classification.
//!
//! The model is asked for a single JSON object.  Whatever it returns goes
//! through fence stripping and a strict parse; anything that is not a JSON
//! object with a label becomes the schema's fallback intent.  There is no
//! retry and no attempt to dig JSON out of prose.

use std::collections::BTreeMap;

use ability_agent::{Message, TextModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{IntentError, Result};

/// Default key holding the intent label.
pub const DEFAULT_LABEL_KEY: &str = "intent";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Remove a surrounding markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_json_fences(raw: &str) -> &str {
    let cleaned = raw.trim();
    let cleaned = cleaned
        .strip_prefix("```json")
        .or_else(|| cleaned.strip_prefix("```JSON"))
        .or_else(|| cleaned.strip_prefix("```"))
        .unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned);
    cleaned.trim()
}

/// Parse model output as a JSON object.
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_json_fences(raw);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(IntentError::ParseFailed {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(IntentError::ParseFailed {
            reason: format!("invalid JSON: {e}"),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One classified turn: a label plus string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Lowercased, trimmed label.
    pub label: String,
    /// Scalar parameters as strings.  Arrays are joined with `", "`.
    pub params: BTreeMap<String, String>,
    /// Array parameters with their elements kept apart.
    pub lists: BTreeMap<String, Vec<String>>,
}

impl IntentRecord {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// A non-blank parameter, trimmed.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// List parameter elements.  A scalar parameter is split on commas.
    pub fn list(&self, key: &str) -> Vec<String> {
        if let Some(items) = self.lists.get(key) {
            return items.clone();
        }
        self.param(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Turn raw model output into an [`IntentRecord`].
///
/// `None` when the output is not a JSON object or has no string label.
pub fn parse_intent_record(raw: &str, label_key: &str) -> Option<IntentRecord> {
    let map = match parse_json_object(raw) {
        Ok(map) => map,
        Err(e) => {
            debug!(error = %e, "intent output rejected");
            return None;
        }
    };

    let label = map
        .get(label_key)
        .and_then(Value::as_str)
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())?;

    let mut record = IntentRecord::new(label);
    for (key, value) in map.iter().filter(|(k, _)| k.as_str() != label_key) {
        match value {
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .filter_map(scalar_to_string)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                record.params.insert(key.clone(), items.join(", "));
                record.lists.insert(key.clone(), items);
            }
            other => {
                if let Some(s) = scalar_to_string(other) {
                    record.params.insert(key.clone(), s);
                }
            }
        }
    }
    Some(record)
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A closed set of intents with an explicit fallback arm.
pub trait IntentSchema: Sized {
    /// Map a record onto a variant.  `None` for unknown labels.
    fn from_record(record: &IntentRecord) -> Option<Self>;

    /// What a failed or unrecognised classification becomes.
    fn fallback() -> Self;
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Prompts a [`TextModel`] for a JSON intent and maps the answer onto an
/// [`IntentSchema`].
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    schema: String,
    label_key: String,
    system_prompt: Option<String>,
}

impl IntentClassifier {
    /// `schema` describes the JSON shape and allowed labels, e.g.
    /// `{"intent": "add|remove|read|clear|unknown", "items": ["..."]}`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            label_key: DEFAULT_LABEL_KEY.to_string(),
            system_prompt: None,
        }
    }

    pub fn with_label_key(mut self, key: impl Into<String>) -> Self {
        self.label_key = key.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn label_key(&self) -> &str {
        &self.label_key
    }

    /// The classification prompt for one utterance.
    pub fn build_prompt(&self, utterance: &str, context: Option<&str>) -> String {
        let mut prompt = String::from(
            "Classify what the user wants. The input comes from speech-to-text and may be \
             noisy; pick the closest match.\n\n",
        );
        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str("Context: ");
            prompt.push_str(context.trim());
            prompt.push_str("\n\n");
        }
        prompt.push_str("Respond with this JSON shape:\n");
        prompt.push_str(&self.schema);
        prompt.push_str("\n\nUser said: \"");
        prompt.push_str(utterance.trim());
        prompt.push_str("\"\n\nReturn ONLY valid JSON. No markdown, no explanation.");
        prompt
    }

    /// Ask the model and parse its answer.  Any failure is `None`.
    pub async fn classify_record(
        &self,
        model: &dyn TextModel,
        utterance: &str,
        context: Option<&str>,
        history: &[Message],
    ) -> Option<IntentRecord> {
        let prompt = self.build_prompt(utterance, context);
        let raw = match model
            .generate(&prompt, history, self.system_prompt.as_deref())
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "intent classification call failed");
                return None;
            }
        };
        let record = parse_intent_record(&raw, &self.label_key);
        if record.is_none() {
            warn!(raw = %raw, "unparseable intent output, using fallback");
        }
        record
    }

    /// Classify into `I`, falling back on any failure or unknown label.
    pub async fn classify<I: IntentSchema>(
        &self,
        model: &dyn TextModel,
        utterance: &str,
        context: Option<&str>,
        history: &[Message],
    ) -> I {
        self.classify_record(model, utterance, context, history)
            .await
            .and_then(|record| {
                let intent = I::from_record(&record);
                if intent.is_none() {
                    debug!(label = %record.label, "unknown intent label");
                }
                intent
            })
            .unwrap_or_else(I::fallback)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
