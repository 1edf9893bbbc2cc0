//! Weather: current conditions for a city, with a home city, a preferred
//! temperature unit, and up to five favourites.
//!
//! Lookup order: geocode (Nominatim, then Open-Meteo), then the Open-Meteo
//! forecast.  When the forecast cannot be fetched the text model gives an
//! approximate answer instead, and when that fails too the user still
//! hears one sentence.

use std::sync::LazyLock;

use ability_adapters::{
    CurrentConditions, TempUnit, WeatherClient, format_temperature, recommendations,
};
use ability_agent::Worker;
use ability_intent::{IntentClassifier, IntentRecord, IntentSchema, PendingState, clean_input};
use ability_store::{load_json, save_json};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::manifest::AbilityManifest;
use crate::session::{Conversation, TurnOutcome};

pub const ID: &str = "weather";
pub const PREFS_FILE: &str = "weather_preferences.json";
pub const MAX_FAVORITES: usize = 5;

const SCHEMA: &str = r#"{"intent": "weather|set_home|set_unit|add_favorite|remove_favorite|favorites|unknown", "city": "city name or empty", "unit": "celsius|fahrenheit or empty"}
"weather" is any request for weather or a bare city name. Leave "city" empty when none is named."#;

const HELP: &str = "You can ask for the weather in any city, set your home city, or pick Celsius or Fahrenheit.";

static TRIGGER_CITY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|for|at)\s+([a-z][a-z' -]*?)(?:\s+(?:today|now|right now|tonight|please))*$")
        .ok()
});

pub fn manifest() -> AbilityManifest {
    AbilityManifest::new(ID, ["weather", "forecast"])
        .with_description("Current weather for any city.")
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherPreferences {
    pub home_city: Option<String>,
    pub temp_unit: TempUnit,
    pub favorites: Vec<String>,
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherIntent {
    Weather(Option<String>),
    SetHome(Option<String>),
    SetUnit(Option<TempUnit>),
    AddFavorite(Option<String>),
    RemoveFavorite(Option<String>),
    Favorites,
    Unknown,
}

impl IntentSchema for WeatherIntent {
    fn from_record(record: &IntentRecord) -> Option<Self> {
        let city = || record.param("city").map(title_case);
        match record.label.as_str() {
            "weather" => Some(Self::Weather(city())),
            "set_home" => Some(Self::SetHome(city())),
            "set_unit" => Some(Self::SetUnit(record.param("unit").and_then(parse_unit))),
            "add_favorite" => Some(Self::AddFavorite(city())),
            "remove_favorite" => Some(Self::RemoveFavorite(city())),
            "favorites" => Some(Self::Favorites),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    fn fallback() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Location,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_unit(text: &str) -> Option<TempUnit> {
    let text = text.to_lowercase();
    if text.contains("fahr") {
        Some(TempUnit::Fahrenheit)
    } else if text.contains("cels") || text.contains("centi") {
        Some(TempUnit::Celsius)
    } else {
        None
    }
}

/// "new york" -> "New York".
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A city named at the end of the trigger phrase ("weather in Paris").
pub fn city_from_trigger(trigger: &str) -> Option<String> {
    let cleaned = clean_input(trigger);
    let re = TRIGGER_CITY.as_ref()?;
    let city = re.captures(&cleaned)?.get(1)?.as_str().trim();
    if city.is_empty() || matches!(city, "the" | "my city" | "here") {
        return None;
    }
    Some(title_case(city))
}

fn join_spoken(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// The one-sentence report.
pub fn format_report(city: &str, now: &CurrentConditions, unit: TempUnit) -> String {
    let recs = recommendations(now.temperature_c, now.wind_kph, now.rain_chance);
    let advice = if recs.is_empty() {
        String::new()
    } else {
        format!(", so {}", join_spoken(&recs))
    };
    format!(
        "In {city} it's {} and {} with wind at {} kilometers per hour{advice}.",
        format_temperature(now.temperature_c, unit),
        now.description(),
        now.wind_kph.round() as i64,
    )
}

/// First sentence of model output, with a lowercased opening so it can
/// follow "but".
fn as_continuation(text: &str) -> Option<String> {
    let text = text.trim().trim_matches('"');
    let first = match text.find(". ") {
        Some(end) => &text[..=end],
        None => text,
    };
    let first = first.trim();
    if first.is_empty() {
        return None;
    }
    let keep_case = first.starts_with("I ") || first.starts_with("I'");
    let mut out = String::with_capacity(first.len() + 1);
    let mut chars = first.chars();
    if let Some(c) = chars.next() {
        if keep_case {
            out.push(c);
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out.extend(chars);
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

pub struct WeatherSession {
    client: WeatherClient,
    prefs: WeatherPreferences,
    pending: PendingState<Slot>,
    classifier: IntentClassifier,
    direct_city: Option<String>,
    trigger: Option<String>,
}

impl WeatherSession {
    pub fn new(client: WeatherClient) -> Self {
        Self {
            client,
            prefs: WeatherPreferences::default(),
            pending: PendingState::new(),
            classifier: IntentClassifier::new(SCHEMA),
            direct_city: None,
            trigger: None,
        }
    }

    pub fn preferences(&self) -> &WeatherPreferences {
        &self.prefs
    }

    async fn save_prefs(&self, worker: &Worker) -> Result<()> {
        save_json(worker.storage(), PREFS_FILE, &self.prefs).await?;
        Ok(())
    }

    /// Look up `city` and end the session with the report or a fallback.
    async fn report(&mut self, worker: &Worker, city: &str) -> Result<TurnOutcome> {
        let coords = match self.client.geocode(city).await {
            Ok(coords) => coords,
            Err(e) => {
                warn!(city, error = %e, "geocoding failed");
                self.pending.wait_for(Slot::Location);
                worker
                    .speak(&format!("I couldn't find {city}. Try a different city name."))
                    .await?;
                return Ok(TurnOutcome::Continue);
            }
        };
        self.pending.clear();

        let sentence = match self.client.current(&coords).await {
            Ok(now) => {
                info!(city = %coords.name, temp = now.temperature_c, "weather fetched");
                format_report(&coords.name, &now, self.prefs.temp_unit)
            }
            Err(e) => {
                warn!(city = %coords.name, error = %e, "forecast unavailable, asking the model");
                self.estimate(worker, &coords.name).await
            }
        };
        Ok(TurnOutcome::end_with(sentence))
    }

    async fn estimate(&self, worker: &Worker, city: &str) -> String {
        let unit = match self.prefs.temp_unit {
            TempUnit::Celsius => "Celsius",
            TempUnit::Fahrenheit => "Fahrenheit",
        };
        let prompt = format!(
            "In one short spoken sentence, describe the typical weather in {city} at this time \
             of year, with temperatures in {unit}. It is an estimate, not live data."
        );
        match worker.text_to_text(&prompt).await {
            Ok(text) => match as_continuation(&text) {
                Some(rest) => format!("I couldn't reach the weather service, but {rest}"),
                None => unavailable(city),
            },
            Err(e) => {
                warn!(city, error = %e, "weather estimate failed");
                unavailable(city)
            }
        }
    }

    async fn weather_for(&mut self, worker: &Worker, city: Option<String>) -> Result<TurnOutcome> {
        match city.or_else(|| self.prefs.home_city.clone()) {
            Some(city) => self.report(worker, &city).await,
            None => {
                self.pending.wait_for(Slot::Location);
                worker.speak("Which city?").await?;
                Ok(TurnOutcome::Continue)
            }
        }
    }

    async fn update_prefs(&mut self, worker: &Worker, intent: WeatherIntent) -> Result<String> {
        let reply = match intent {
            WeatherIntent::SetHome(Some(city)) => {
                self.prefs.home_city = Some(city.clone());
                self.save_prefs(worker).await?;
                format!("Home city set to {city}.")
            }
            WeatherIntent::SetUnit(Some(unit)) => {
                self.prefs.temp_unit = unit;
                self.save_prefs(worker).await?;
                match unit {
                    TempUnit::Celsius => "Temperatures will be in Celsius.".to_string(),
                    TempUnit::Fahrenheit => "Temperatures will be in Fahrenheit.".to_string(),
                }
            }
            WeatherIntent::SetUnit(None) => "Say Celsius or Fahrenheit.".to_string(),
            WeatherIntent::AddFavorite(Some(city)) => {
                if self.prefs.favorites.iter().any(|f| f.eq_ignore_ascii_case(&city)) {
                    format!("{city} is already a favorite.")
                } else if self.prefs.favorites.len() >= MAX_FAVORITES {
                    format!("You already have {MAX_FAVORITES} favorites. Remove one first.")
                } else {
                    self.prefs.favorites.push(city.clone());
                    self.save_prefs(worker).await?;
                    format!("Added {city} to your favorites.")
                }
            }
            WeatherIntent::RemoveFavorite(Some(city)) => {
                let before = self.prefs.favorites.len();
                self.prefs.favorites.retain(|f| !f.eq_ignore_ascii_case(&city));
                if self.prefs.favorites.len() == before {
                    format!("{city} isn't in your favorites.")
                } else {
                    self.save_prefs(worker).await?;
                    format!("Removed {city} from your favorites.")
                }
            }
            WeatherIntent::Favorites => {
                if self.prefs.favorites.is_empty() {
                    "You don't have any favorite cities yet.".to_string()
                } else {
                    let names: Vec<&str> =
                        self.prefs.favorites.iter().map(String::as_str).collect();
                    format!("Your favorites are {}.", join_spoken(&names))
                }
            }
            WeatherIntent::SetHome(None)
            | WeatherIntent::AddFavorite(None)
            | WeatherIntent::RemoveFavorite(None) => "Which city did you mean?".to_string(),
            WeatherIntent::Weather(_) | WeatherIntent::Unknown => HELP.to_string(),
        };
        Ok(reply)
    }
}

fn unavailable(city: &str) -> String {
    format!("Sorry, I couldn't get the weather for {city} right now.")
}

#[async_trait]
impl Conversation for WeatherSession {
    fn greeting(&self) -> String {
        match &self.prefs.home_city {
            Some(home) => format!("Want the weather for {home}, or another city?"),
            None => "Which city would you like the weather for?".to_string(),
        }
    }

    async fn on_start(&mut self, worker: &Worker) -> Result<()> {
        self.prefs = match load_json(worker.storage(), PREFS_FILE).await {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(error = %e, "could not load weather preferences, using defaults");
                WeatherPreferences::default()
            }
        };
        let trigger = worker.trigger_transcription();
        self.direct_city = city_from_trigger(trigger);
        if self.direct_city.is_some() {
            self.trigger = Some(trigger.to_string());
        }
        debug!(home = ?self.prefs.home_city, direct = ?self.direct_city, "weather session started");
        Ok(())
    }

    fn opening_turn(&mut self) -> Option<String> {
        self.trigger.take()
    }

    async fn handle(&mut self, worker: &Worker, utterance: &str) -> Result<TurnOutcome> {
        if let Some(city) = self.direct_city.take() {
            return self.report(worker, &city).await;
        }

        if self.pending.is_waiting_for(&Slot::Location) {
            let cleaned = clean_input(utterance);
            let city = cleaned
                .strip_prefix("in ")
                .or_else(|| cleaned.strip_prefix("for "))
                .unwrap_or(&cleaned);
            let city = title_case(city);
            return self.report(worker, &city).await;
        }

        let intent: WeatherIntent = self
            .classifier
            .classify(worker.model(), utterance, None, &[])
            .await;
        debug!(intent = ?intent, "weather intent");

        match intent {
            WeatherIntent::Weather(city) => self.weather_for(worker, city).await,
            other => {
                let reply = self.update_prefs(worker, other).await?;
                worker.speak(&reply).await?;
                Ok(TurnOutcome::Continue)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
