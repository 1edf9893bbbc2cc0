//! Integration tests for the ability-adapters crate.
//!
//! The weather client runs against a wiremock server standing in for
//! Nominatim and both Open-Meteo services.

use std::time::Duration;

use ability_adapters::{AdapterError, HttpFetcher, WeatherClient, WeatherEndpoints};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> WeatherClient {
    let fetcher = HttpFetcher::new("abilities-test", timeout).unwrap();
    WeatherClient::new(fetcher).with_endpoints(WeatherEndpoints::under(&server.uri()))
}

async fn mount_forecast(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_days", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": {"temperature_2m": 9.0, "wind_speed_10m": 22.0, "weather_code": 61},
            "daily": {"precipitation_probability_max": [70]}
        })))
        .mount(server)
        .await;
}

// ═══════════════════════════════════════════════════════════════════════
//  Geocoding
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn primary_geocoder_is_used_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Dublin"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "53.35", "lon": "-6.26", "display_name": "Dublin, Leinster, Ireland"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let weather = client(&server, Duration::from_secs(5));
    let first = weather.geocode("Dublin").await.unwrap();
    let second = weather.geocode("  dublin ").await.unwrap();
    assert_eq!(first.name, "Dublin");
    assert_eq!(first, second);
}

#[tokio::test]
async fn fallback_geocoder_after_primary_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Lagos"))
        .and(query_param("count", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "Lagos", "latitude": 6.45, "longitude": 3.39}]
        })))
        .mount(&server)
        .await;

    let coords = client(&server, Duration::from_secs(5))
        .geocode("Lagos")
        .await
        .unwrap();
    assert_eq!(coords.name, "Lagos");
    assert!((coords.longitude - 3.39).abs() < 1e-9);
}

#[tokio::test]
async fn both_geocoders_empty_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"generationtime_ms": 0.1})))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .geocode("Xyzzyville")
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::NotFound { .. }));
}

// ═══════════════════════════════════════════════════════════════════════
//  Forecast
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn forecast_round() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "51.5", "lon": "-0.12", "name": "London"}
        ])))
        .mount(&server)
        .await;
    mount_forecast(&server).await;

    let weather = client(&server, Duration::from_secs(5));
    let coords = weather.geocode("London").await.unwrap();
    let now = weather.current(&coords).await.unwrap();
    assert_eq!(now.description(), "light rain");
    assert_eq!(now.rain_chance, Some(70.0));
}

#[tokio::test]
async fn forecast_timeout_is_reported_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({})),
        )
        .mount(&server)
        .await;

    let weather = client(&server, Duration::from_millis(500));
    let coords = ability_adapters::Coordinates {
        latitude: 0.0,
        longitude: 0.0,
        name: "Null Island".into(),
    };
    let started = std::time::Instant::now();
    let err = weather.current(&coords).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(2));
}
