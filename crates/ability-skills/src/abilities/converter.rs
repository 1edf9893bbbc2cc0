//! Unit converter: "how many cups in a liter?"
//!
//! The model only extracts `{value, from, to}`.  The arithmetic is done
//! locally from a fixed table; anything outside the table is answered by
//! the model in one sentence.

use std::time::Duration;

use ability_agent::Worker;
use ability_intent::{ExitDetector, parse_json_object};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::manifest::AbilityManifest;
use crate::session::{Conversation, TurnOutcome};

pub const ID: &str = "unit-converter";

const GREETING: &str = "Unit converter ready. What would you like to convert?";
const FOLLOW_UP: &str = "Anything else to convert?";
const WARM_UP: Duration = Duration::from_millis(100);

pub fn manifest() -> AbilityManifest {
    AbilityManifest::new(ID, ["unit converter", "convert"])
        .with_description("Converts lengths, weights, volumes, and temperatures.")
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Length,
    Mass,
    Volume,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    pub dimension: Dimension,
    /// Size in the dimension's base unit (metre, gram, millilitre).
    /// Unused for temperatures.
    factor: f64,
    aliases: &'static [&'static str],
}

impl Unit {
    pub fn spoken(&self, value: f64) -> &'static str {
        if (value - 1.0).abs() < f64::EPSILON {
            self.singular
        } else {
            self.plural
        }
    }
}

const fn unit(
    symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    dimension: Dimension,
    factor: f64,
    aliases: &'static [&'static str],
) -> Unit {
    Unit {
        symbol,
        singular,
        plural,
        dimension,
        factor,
        aliases,
    }
}

use Dimension::{Length, Mass, Temperature, Volume};

static UNITS: &[Unit] = &[
    unit("mm", "millimeter", "millimeters", Length, 0.001, &["millimetre", "millimetres"]),
    unit("cm", "centimeter", "centimeters", Length, 0.01, &["centimetre", "centimetres"]),
    unit("m", "meter", "meters", Length, 1.0, &["metre", "metres"]),
    unit("km", "kilometer", "kilometers", Length, 1000.0, &["kilometre", "kilometres", "kms"]),
    unit("in", "inch", "inches", Length, 0.0254, &[]),
    unit("ft", "foot", "feet", Length, 0.3048, &[]),
    unit("yd", "yard", "yards", Length, 0.9144, &[]),
    unit("mi", "mile", "miles", Length, 1609.344, &[]),
    unit("mg", "milligram", "milligrams", Mass, 0.001, &["milligramme"]),
    unit("g", "gram", "grams", Mass, 1.0, &["gramme", "grammes"]),
    unit("kg", "kilogram", "kilograms", Mass, 1000.0, &["kilo", "kilos", "kgs"]),
    unit("oz", "ounce", "ounces", Mass, 28.349523125, &[]),
    unit("lb", "pound", "pounds", Mass, 453.59237, &["lbs"]),
    unit("ml", "milliliter", "milliliters", Volume, 1.0, &["millilitre", "millilitres"]),
    unit("l", "liter", "liters", Volume, 1000.0, &["litre", "litres"]),
    unit("tsp", "teaspoon", "teaspoons", Volume, 4.92892159375, &[]),
    unit("tbsp", "tablespoon", "tablespoons", Volume, 14.78676478125, &[]),
    unit("cup", "cup", "cups", Volume, 236.5882365, &[]),
    unit("fl oz", "fluid ounce", "fluid ounces", Volume, 29.5735295625, &["floz", "fl. oz"]),
    unit("gal", "gallon", "gallons", Volume, 3785.411784, &[]),
    unit("c", "degree Celsius", "degrees Celsius", Temperature, 1.0, &["celsius", "centigrade", "degrees celsius"]),
    unit("f", "degree Fahrenheit", "degrees Fahrenheit", Temperature, 1.0, &["fahrenheit", "degrees fahrenheit"]),
    unit("k", "kelvin", "kelvin", Temperature, 1.0, &["kelvins"]),
];

/// Look a unit up by symbol, name, plural, or alias.
pub fn find_unit(name: &str) -> Option<&'static Unit> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    if name.is_empty() {
        return None;
    }
    UNITS.iter().find(|u| {
        u.symbol == name
            || u.singular.eq_ignore_ascii_case(&name)
            || u.plural.eq_ignore_ascii_case(&name)
            || u.aliases.contains(&name.as_str())
    })
}

fn to_celsius(value: f64, unit: &Unit) -> f64 {
    match unit.symbol {
        "f" => (value - 32.0) * 5.0 / 9.0,
        "k" => value - 273.15,
        _ => value,
    }
}

fn from_celsius(value: f64, unit: &Unit) -> f64 {
    match unit.symbol {
        "f" => value * 9.0 / 5.0 + 32.0,
        "k" => value + 273.15,
        _ => value,
    }
}

/// Convert between two units of the same dimension.
pub fn convert(value: f64, from: &Unit, to: &Unit) -> Option<f64> {
    if from.dimension != to.dimension {
        return None;
    }
    if from.dimension == Temperature {
        return Some(from_celsius(to_celsius(value, from), to));
    }
    Some(value * from.factor / to.factor)
}

/// Round for speech: at most two decimals, no trailing zeros.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        let text = format!("{rounded:.2}");
        text.trim_end_matches('0').to_string()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub value: f64,
    pub from: String,
    pub to: String,
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Parse the model's `{value, from, to}` answer.
pub fn parse_request(raw: &str) -> Option<Request> {
    let map = parse_json_object(raw).ok()?;
    let value = map.get("value").and_then(number)?;
    let from = map.get("from")?.as_str()?.trim().to_string();
    let to = map.get("to")?.as_str()?.trim().to_string();
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some(Request { value, from, to })
}

/// Spoken answer for a request the local table can handle.
pub fn answer_locally(request: &Request) -> Option<String> {
    let from = find_unit(&request.from)?;
    let to = find_unit(&request.to)?;
    let result = convert(request.value, from, to)?;
    Some(format!(
        "{} {} is about {} {}.",
        format_number(request.value),
        from.spoken(request.value),
        format_number(result),
        to.spoken(result),
    ))
}

fn extraction_prompt(utterance: &str) -> String {
    format!(
        "Extract the unit conversion from this request.\n\
         Return ONLY JSON: {{\"value\": number, \"from\": \"unit\", \"to\": \"unit\"}}\n\
         Use short unit names (km, mi, lb, kg, cup, ml, f, c).\n\n\
         Request: \"{}\"",
        utterance.trim()
    )
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Converter {
    opening: Option<String>,
    answered: usize,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    async fn answer(&self, worker: &Worker, utterance: &str) -> Option<String> {
        let extracted = match worker.text_to_text(&extraction_prompt(utterance)).await {
            Ok(raw) => parse_request(&raw),
            Err(e) => {
                warn!(error = %e, "conversion extraction failed");
                None
            }
        };
        if let Some(answer) = extracted.as_ref().and_then(answer_locally) {
            return Some(answer);
        }
        debug!(request = ?extracted, "outside the conversion table, asking the model");

        let prompt = format!(
            "Answer this unit conversion question in one short spoken sentence with the \
             number rounded sensibly: \"{}\"",
            utterance.trim()
        );
        match worker.text_to_text(&prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "conversion fallback failed");
                None
            }
        }
    }
}

#[async_trait]
impl Conversation for Converter {
    fn greeting(&self) -> String {
        GREETING.to_string()
    }

    fn max_turns(&self) -> usize {
        20
    }

    fn exit_detector(&self) -> ExitDetector {
        ExitDetector::new().with_responses([
            "no",
            "nope",
            "no thanks",
            "nothing else",
            "that's all",
            "that's it",
            "done",
            "i'm done",
            "bye",
            "goodbye",
            "thanks",
            "thank you",
        ])
    }

    async fn on_start(&mut self, worker: &Worker) -> Result<()> {
        worker.sleep(WARM_UP).await?;
        let trigger = worker.trigger_transcription();
        if trigger.chars().any(|c| c.is_ascii_digit()) {
            self.opening = Some(trigger.to_string());
        }
        Ok(())
    }

    fn opening_turn(&mut self) -> Option<String> {
        self.opening.take()
    }

    async fn handle(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome> {
        match self.answer(worker, utterance).await {
            Some(answer) => {
                self.answered += 1;
                worker.speak(&answer).await?;
                worker.speak(FOLLOW_UP).await?;
            }
            None => worker.speak(&self.apology()).await?,
        }
        Ok(TurnOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
