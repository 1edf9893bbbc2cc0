//! Weather lookups: place name to coordinates to current conditions.
//!
//! Geocoding tries Nominatim first and falls back to the Open-Meteo
//! geocoder once; the forecast comes from Open-Meteo.  Neither call is
//! retried.  Resolved places are cached for an hour so "weather in Paris"
//! twice in a session costs one geocode.

use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AdapterError, Result};
use crate::http::HttpFetcher;

// ═══════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OPEN_METEO_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

const GEOCODE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const GEOCODE_CACHE_MAX_ENTRIES: u64 = 256;

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Short place name suitable for speech ("Paris").
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub wind_kph: f64,
    /// WMO weather interpretation code.
    pub weather_code: i64,
    /// Today's maximum precipitation probability, in percent.
    pub rain_chance: Option<f64>,
}

impl CurrentConditions {
    pub fn description(&self) -> &'static str {
        describe_weather_code(self.weather_code)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Service URLs.  Tests point these at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherEndpoints {
    pub nominatim: String,
    pub geocoding: String,
    pub forecast: String,
}

impl Default for WeatherEndpoints {
    fn default() -> Self {
        Self {
            nominatim: NOMINATIM_URL.to_string(),
            geocoding: OPEN_METEO_GEOCODING_URL.to_string(),
            forecast: OPEN_METEO_FORECAST_URL.to_string(),
        }
    }
}

impl WeatherEndpoints {
    /// All three services under one base URL, at `/search`, `/v1/search`
    /// and `/v1/forecast`.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            nominatim: format!("{base}/search"),
            geocoding: format!("{base}/v1/search"),
            forecast: format!("{base}/v1/forecast"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Client
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct WeatherClient {
    fetcher: HttpFetcher,
    endpoints: WeatherEndpoints,
    cache: Cache<String, Coordinates>,
}

impl WeatherClient {
    pub fn new(fetcher: HttpFetcher) -> Self {
        let cache = Cache::builder()
            .max_capacity(GEOCODE_CACHE_MAX_ENTRIES)
            .time_to_live(GEOCODE_CACHE_TTL)
            .build();
        Self {
            fetcher,
            endpoints: WeatherEndpoints::default(),
            cache,
        }
    }

    pub fn with_endpoints(mut self, endpoints: WeatherEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Resolve a place name, primary geocoder first.
    pub async fn geocode(&self, place: &str) -> Result<Coordinates> {
        let key = normalise_place(place);
        if key.is_empty() {
            return Err(AdapterError::NotFound {
                service: "geocoding".into(),
                query: place.to_string(),
            });
        }
        if let Some(hit) = self.cache.get(&key).await {
            debug!(place = %key, "geocode cache hit");
            return Ok(hit);
        }

        let coords = match self.geocode_nominatim(place.trim()).await {
            Ok(coords) => coords,
            Err(e) => {
                warn!(place = %key, error = %e, "primary geocoder failed, trying fallback");
                self.geocode_open_meteo(place.trim()).await?
            }
        };

        info!(place = %key, lat = coords.latitude, lon = coords.longitude, "geocoded");
        self.cache.insert(key, coords.clone()).await;
        Ok(coords)
    }

    /// Current conditions and today's rain chance.
    pub async fn current(&self, coords: &Coordinates) -> Result<CurrentConditions> {
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();
        let v = self
            .fetcher
            .get_json(
                "open-meteo",
                &self.endpoints.forecast,
                &[
                    ("latitude", lat.as_str()),
                    ("longitude", lon.as_str()),
                    ("current", "temperature_2m,wind_speed_10m,weather_code"),
                    ("daily", "precipitation_probability_max"),
                    ("forecast_days", "1"),
                    ("timezone", "auto"),
                ],
            )
            .await?;
        parse_forecast(&v)
    }

    async fn geocode_nominatim(&self, place: &str) -> Result<Coordinates> {
        let v = self
            .fetcher
            .get_json(
                "nominatim",
                &self.endpoints.nominatim,
                &[("q", place), ("format", "json"), ("limit", "1")],
            )
            .await?;
        parse_nominatim(&v, place)
    }

    async fn geocode_open_meteo(&self, place: &str) -> Result<Coordinates> {
        let v = self
            .fetcher
            .get_json(
                "open-meteo-geocoding",
                &self.endpoints.geocoding,
                &[("name", place), ("count", "1")],
            )
            .await?;
        parse_open_meteo_geocoding(&v, place)
    }
}

fn normalise_place(place: &str) -> String {
    place
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ═══════════════════════════════════════════════════════════════════════
//  Response parsing
// ═══════════════════════════════════════════════════════════════════════

fn invalid(service: &str, reason: impl Into<String>) -> AdapterError {
    AdapterError::InvalidResponse {
        service: service.to_string(),
        reason: reason.into(),
    }
}

/// Nominatim returns coordinates as strings.
fn coord_field(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_nominatim(v: &Value, place: &str) -> Result<Coordinates> {
    let first = v
        .as_array()
        .ok_or_else(|| invalid("nominatim", "expected an array"))?
        .first()
        .ok_or_else(|| AdapterError::NotFound {
            service: "nominatim".into(),
            query: place.to_string(),
        })?;

    let latitude = coord_field(&first["lat"]).ok_or_else(|| invalid("nominatim", "missing lat"))?;
    let longitude =
        coord_field(&first["lon"]).ok_or_else(|| invalid("nominatim", "missing lon"))?;
    let name = first["name"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            first["display_name"]
                .as_str()
                .and_then(|d| d.split(',').next())
        })
        .map(str::trim)
        .unwrap_or(place)
        .to_string();

    Ok(Coordinates {
        latitude,
        longitude,
        name,
    })
}

fn parse_open_meteo_geocoding(v: &Value, place: &str) -> Result<Coordinates> {
    let first = v["results"]
        .as_array()
        .and_then(|r| r.first())
        .ok_or_else(|| AdapterError::NotFound {
            service: "open-meteo-geocoding".into(),
            query: place.to_string(),
        })?;

    let latitude = first["latitude"]
        .as_f64()
        .ok_or_else(|| invalid("open-meteo-geocoding", "missing latitude"))?;
    let longitude = first["longitude"]
        .as_f64()
        .ok_or_else(|| invalid("open-meteo-geocoding", "missing longitude"))?;
    let name = first["name"].as_str().unwrap_or(place).to_string();

    Ok(Coordinates {
        latitude,
        longitude,
        name,
    })
}

fn parse_forecast(v: &Value) -> Result<CurrentConditions> {
    let current = &v["current"];
    let temperature_c = current["temperature_2m"]
        .as_f64()
        .ok_or_else(|| invalid("open-meteo", "missing current.temperature_2m"))?;
    let wind_kph = current["wind_speed_10m"]
        .as_f64()
        .ok_or_else(|| invalid("open-meteo", "missing current.wind_speed_10m"))?;
    let weather_code = current["weather_code"]
        .as_i64()
        .or_else(|| current["weather_code"].as_f64().map(|c| c as i64))
        .ok_or_else(|| invalid("open-meteo", "missing current.weather_code"))?;
    let rain_chance = v["daily"]["precipitation_probability_max"][0].as_f64();

    Ok(CurrentConditions {
        temperature_c,
        wind_kph,
        weather_code,
        rain_chance,
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  Speech helpers
// ═══════════════════════════════════════════════════════════════════════

/// Short spoken phrase for a WMO weather code.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "clear skies",
        1 => "mostly clear skies",
        2 => "partly cloudy skies",
        3 => "overcast skies",
        45 | 48 => "fog",
        51 | 53 | 55 => "drizzle",
        56 | 57 => "freezing drizzle",
        61 => "light rain",
        63 => "rain",
        65 => "heavy rain",
        66 | 67 => "freezing rain",
        71 => "light snow",
        73 => "snow",
        75 => "heavy snow",
        77 => "snow grains",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorms",
        96 | 99 => "thunderstorms with hail",
        _ => "mixed conditions",
    }
}

/// Practical advice for the conditions, most important first.
pub fn recommendations(temp_c: f64, wind_kph: f64, rain_chance: Option<f64>) -> Vec<&'static str> {
    let mut recs = Vec::new();

    match rain_chance {
        Some(p) if p > 60.0 => recs.push("bring an umbrella"),
        Some(p) if p > 30.0 => recs.push("keep an umbrella handy"),
        _ => {}
    }

    if temp_c < 5.0 {
        recs.push("wear a heavy coat");
    } else if temp_c < 15.0 {
        recs.push("wear a jacket");
    } else if temp_c > 30.0 {
        recs.push("stay hydrated");
    }

    if wind_kph > 40.0 {
        recs.push("secure loose items");
    }
    recs
}

/// "21 degrees Celsius" or "70 degrees Fahrenheit".
pub fn format_temperature(temp_c: f64, unit: TempUnit) -> String {
    match unit {
        TempUnit::Celsius => format!("{} degrees Celsius", temp_c.round() as i64),
        TempUnit::Fahrenheit => {
            format!("{} degrees Fahrenheit", (temp_c * 9.0 / 5.0 + 32.0).round() as i64)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
