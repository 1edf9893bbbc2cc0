//! External services used by voice abilities.
//!
//! - [`http::HttpFetcher`]: JSON GET with a fixed timeout and typed errors.
//! - [`weather::WeatherClient`]: geocoding with a fallback provider, plus
//!   current conditions from Open-Meteo.

pub mod error;
pub mod http;
pub mod weather;

pub use error::{AdapterError, Result};
pub use http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpFetcher};
pub use weather::{
    Coordinates, CurrentConditions, TempUnit, WeatherClient, WeatherEndpoints,
    describe_weather_code, format_temperature, recommendations,
};
