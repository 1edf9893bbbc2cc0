//! Integration tests for the ability-skills crate.
//!
//! Every built-in ability is driven through the [`AbilityHost`] with
//! scripted speech and a scripted text model, so each test sees exactly
//! what the user would hear and how often normal flow was resumed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ability_adapters::{DEFAULT_USER_AGENT, HttpFetcher, WeatherClient, WeatherEndpoints};
use ability_agent::{ScriptedModel, ScriptedSpeech};
use ability_skills::abilities::{converter, grocery, journal, trivia, weather};
use ability_skills::{AbilityHost, HostSettings, SessionOutcome, builtin_abilities};
use ability_store::{FileStorage, MemoryStorage, load_json, save_json};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SATURN: &str = r#"{"question": "Which planet has the most moons?", "options": {"A": "Mars", "B": "Saturn", "C": "Venus", "D": "Mercury"}, "correct_answer": "B", "explanation": "Saturn has over 140 known moons."}"#;

fn offline_weather() -> WeatherClient {
    WeatherClient::new(HttpFetcher::with_defaults().unwrap())
}

fn host_with(model: ScriptedModel, storage: &MemoryStorage, weather: WeatherClient) -> AbilityHost {
    let mut host = AbilityHost::new(Arc::new(model), Arc::new(storage.clone()));
    for ability in builtin_abilities(weather) {
        host.register(ability).unwrap();
    }
    host
}

fn host(model: ScriptedModel, storage: &MemoryStorage) -> AbilityHost {
    host_with(model, storage, offline_weather())
}

// ═══════════════════════════════════════════════════════════════════════
//  Session lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn exit_word_ends_session_in_one_turn() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["stop"]);

    let report = host
        .invoke(grocery::ID, Arc::new(speech.clone()), "open my grocery list")
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.resume_calls, 1);
    assert_eq!(speech.listens(), 1);
    assert_eq!(
        speech.spoken(),
        vec![
            "Grocery list ready. Say add, remove, read, or clear.".to_string(),
            "List saved. Goodbye!".to_string(),
        ]
    );
}

#[tokio::test]
async fn hotword_routes_to_the_right_ability() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["stop"]);

    let report = host
        .handle_utterance("let's play some trivia", Arc::new(speech.clone()))
        .await
        .unwrap()
        .expect("trivia should match");

    assert_eq!(report.ability, trivia::ID);
    assert_eq!(report.resume_calls, 1);
    assert_eq!(
        speech.spoken().first().map(String::as_str),
        Some("Welcome to Open Trivia. Ready to test your knowledge?")
    );

    let none = host
        .handle_utterance("turn on the lights", Arc::new(ScriptedSpeech::default()))
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn hung_session_times_out_and_still_resumes_once() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage).with_settings(HostSettings {
        session_timeout: Duration::from_millis(200),
    });
    let speech = ScriptedSpeech::new(Vec::<String>::new()).hang_when_exhausted();

    let report = host
        .invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::TimedOut);
    assert_eq!(report.resume_calls, 1);
    let info = host.registry().get(grocery::ID).unwrap();
    assert!(info.last_error.is_some());
}

#[tokio::test]
async fn silence_warns_then_closes() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["", "um", "", ""]);

    let report = host
        .invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(report.resume_calls, 1);
    let spoken = speech.spoken();
    assert!(spoken.contains(&"Still here if you need me. Otherwise I'll close.".to_string()));
    assert_eq!(spoken.last().map(String::as_str), Some("List saved. Goodbye!"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Grocery list
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn grocery_add_remove_read_done() {
    let storage = MemoryStorage::new();
    let model = ScriptedModel::new()
        .when(
            r#"said: "add milk and eggs""#,
            r#"{"intent": "add", "items": ["milk", "eggs"]}"#,
        )
        .when(
            r#"said: "remove milk""#,
            r#"```json
{"intent": "remove", "items": ["milk"]}
```"#,
        )
        .when(r#"said: "what's on my list""#, r#"{"intent": "read", "items": []}"#);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["add milk and eggs", "remove milk", "what's on my list", "done"]);

    let report = host
        .invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.resume_calls, 1);
    assert_eq!(
        speech.spoken(),
        vec![
            "Grocery list ready. Say add, remove, read, or clear.".to_string(),
            "Added 2 items.".to_string(),
            "Removed milk.".to_string(),
            "You have 1 item: eggs.".to_string(),
            "List saved. Goodbye!".to_string(),
        ]
    );

    let stored: Vec<String> = load_json(&storage, grocery::LIST_FILE).await.unwrap();
    assert_eq!(stored, vec!["eggs".to_string()]);
    assert_eq!(storage.names(), vec![grocery::LIST_FILE.to_string()]);
}

#[tokio::test]
async fn malformed_model_output_falls_back_to_help() {
    let storage = MemoryStorage::new();
    let model = ScriptedModel::new().when(
        r#"said: "pop some stuff on there""#,
        "Sure! I'll add that for you.",
    );
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["pop some stuff on there", "stop"]);

    host.invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(speech.spoken()[1], "Say add, remove, read, or clear.");
}

#[tokio::test]
async fn model_outage_is_survivable() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["add bread", "stop"]);

    let report = host
        .invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(speech.spoken()[1], "Say add, remove, read, or clear.");
}

#[tokio::test]
async fn clearing_one_item_is_singular() {
    let storage = MemoryStorage::new();
    save_json(&storage, grocery::LIST_FILE, &vec!["milk".to_string()])
        .await
        .unwrap();
    let model = ScriptedModel::new().when(
        r#"said: "clear the list""#,
        r#"{"intent": "clear", "items": []}"#,
    );
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["clear the list", "done"]);

    host.invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(speech.spoken()[1], "Cleared 1 item.");
    let stored: Vec<String> = load_json(&storage, grocery::LIST_FILE).await.unwrap();
    assert!(stored.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  Crash survival
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn backup_is_recovered_when_main_file_is_missing() {
    let storage = MemoryStorage::new();
    storage
        .write("grocery_list.json.bak", r#"["bread"]"#)
        .await
        .unwrap();

    let model = ScriptedModel::new().when(r#"said: "read it""#, r#"{"intent": "read"}"#);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["read it", "stop"]);
    host.invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(speech.spoken()[1], "You have 1 item: bread.");
    assert_eq!(storage.names(), vec![grocery::LIST_FILE.to_string()]);
}

#[tokio::test]
async fn backup_is_recovered_when_main_file_is_corrupt() {
    let storage = MemoryStorage::new();
    storage.write(grocery::LIST_FILE, r#"["milk""#).await.unwrap();
    storage
        .write("grocery_list.json.bak", r#"["milk","tea"]"#)
        .await
        .unwrap();

    let model = ScriptedModel::new().when(r#"said: "read it""#, r#"{"intent": "read"}"#);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["read it", "stop"]);
    host.invoke(grocery::ID, Arc::new(speech.clone()), "grocery list")
        .await
        .unwrap();

    assert_eq!(speech.spoken()[1], "You have 2 items: milk, tea.");
    assert_eq!(
        storage.read(grocery::LIST_FILE).await.unwrap(),
        r#"["milk","tea"]"#
    );
}

#[tokio::test]
async fn saving_twice_is_idempotent() {
    let storage = MemoryStorage::new();
    let items = vec!["eggs".to_string()];
    save_json(&storage, grocery::LIST_FILE, &items).await.unwrap();
    let first = storage.read(grocery::LIST_FILE).await.unwrap();
    save_json(&storage, grocery::LIST_FILE, &items).await.unwrap();

    assert_eq!(storage.read(grocery::LIST_FILE).await.unwrap(), first);
    assert_eq!(storage.names(), vec![grocery::LIST_FILE.to_string()]);
}

// ═══════════════════════════════════════════════════════════════════════
//  Weather
// ═══════════════════════════════════════════════════════════════════════

async fn mount_open_meteo_geocoder(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "Dublin", "latitude": 53.35, "longitude": -6.26}]
        })))
        .mount(server)
        .await;
}

fn weather_client(server: &MockServer, timeout: Duration) -> WeatherClient {
    WeatherClient::new(HttpFetcher::new(DEFAULT_USER_AGENT, timeout).unwrap())
        .with_endpoints(WeatherEndpoints::under(&server.uri()))
}

#[tokio::test]
async fn weather_for_city_named_in_trigger() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "48.8566", "lon": "2.3522", "name": "Paris"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current": {"temperature_2m": 20.0, "wind_speed_10m": 5.0, "weather_code": 0},
            "daily": {"precipitation_probability_max": [0.0]}
        })))
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let host = host_with(
        ScriptedModel::new(),
        &storage,
        weather_client(&server, Duration::from_secs(5)),
    );
    let speech = ScriptedSpeech::new(Vec::<String>::new());

    let report = host
        .handle_utterance("what's the weather in Paris", Arc::new(speech.clone()))
        .await
        .unwrap()
        .expect("weather should match");

    assert_eq!(report.ability, weather::ID);
    assert_eq!(report.resume_calls, 1);
    assert_eq!(speech.listens(), 0);
    assert_eq!(
        speech.spoken(),
        vec![
            "In Paris it's 20 degrees Celsius and clear skies with wind at 5 kilometers per hour."
                .to_string()
        ]
    );
}

#[tokio::test]
async fn forecast_outage_falls_back_to_model_estimate() {
    let server = MockServer::start().await;
    mount_open_meteo_geocoder(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let model = ScriptedModel::new().when(
        "typical weather in dublin",
        "It is usually mild and damp this time of year, around 12 degrees. Bring a coat.",
    );
    let host = host_with(model, &storage, weather_client(&server, Duration::from_secs(5)));
    let speech = ScriptedSpeech::new(Vec::<String>::new());

    let report = host
        .invoke(weather::ID, Arc::new(speech.clone()), "weather in dublin")
        .await
        .unwrap();

    assert_eq!(report.resume_calls, 1);
    assert_eq!(
        speech.spoken(),
        vec![
            "I couldn't reach the weather service, but it is usually mild and damp this time \
             of year, around 12 degrees."
                .to_string()
        ]
    );
}

#[tokio::test]
async fn forecast_and_model_outage_still_answers() {
    let server = MockServer::start().await;
    mount_open_meteo_geocoder(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let host = host_with(
        ScriptedModel::new(),
        &storage,
        weather_client(&server, Duration::from_secs(5)),
    );
    let speech = ScriptedSpeech::new(Vec::<String>::new());

    host.invoke(weather::ID, Arc::new(speech.clone()), "weather in dublin")
        .await
        .unwrap();

    assert_eq!(
        speech.spoken(),
        vec!["Sorry, I couldn't get the weather for Dublin right now.".to_string()]
    );
}

#[tokio::test]
async fn slow_forecast_is_cut_off_and_still_answered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "53.35", "lon": "-6.26", "name": "Dublin"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let host = host_with(
        ScriptedModel::new(),
        &storage,
        weather_client(&server, Duration::from_millis(500)),
    );
    let speech = ScriptedSpeech::new(Vec::<String>::new());

    let started = Instant::now();
    let report = host
        .invoke(weather::ID, Arc::new(speech.clone()), "weather for dublin")
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(report.resume_calls, 1);
    let spoken = speech.spoken();
    assert_eq!(spoken.len(), 1);
    assert!(!spoken[0].trim().is_empty());
}

#[tokio::test]
async fn weather_asks_for_a_city_and_remembers_home() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let storage = MemoryStorage::new();
    let model = ScriptedModel::new().when(
        r#"said: "set my home city to oslo""#,
        r#"{"intent": "set_home", "city": "oslo", "unit": ""}"#,
    );
    let host = host_with(model, &storage, weather_client(&server, Duration::from_secs(5)));
    let speech = ScriptedSpeech::new(["set my home city to oslo", "stop"]);

    host.invoke(weather::ID, Arc::new(speech.clone()), "weather")
        .await
        .unwrap();

    assert_eq!(
        speech.spoken(),
        vec![
            "Which city would you like the weather for?".to_string(),
            "Home city set to Oslo.".to_string(),
            "Goodbye!".to_string(),
        ]
    );
    let prefs: weather::WeatherPreferences =
        load_json(&storage, weather::PREFS_FILE).await.unwrap();
    assert_eq!(prefs.home_city.as_deref(), Some("Oslo"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Voice journal
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn journal_add_confirm_and_read_back() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new([
        "add I went running today",
        "yes",
        "read my journal",
        "stop",
    ]);

    let report = host
        .invoke(journal::ID, Arc::new(speech.clone()), "open my journal")
        .await
        .unwrap();

    assert_eq!(report.resume_calls, 1);
    let spoken = speech.spoken();
    assert_eq!(spoken[0], "Your journal is open. What would you like to do?");
    assert_eq!(spoken[1], "I'll save: I went running today. Should I save it?");
    assert_eq!(spoken[2], "Saved.");
    assert!(spoken[3].starts_with("Your last entry: on "));
    assert!(spoken[3].contains("I went running today"));

    let raw = storage.read(journal::ENTRIES_FILE).await.unwrap();
    assert!(raw.trim_end().ends_with(" | I went running today"));
    let prefs: journal::JournalPrefs = load_json(&storage, journal::PREFS_FILE).await.unwrap();
    assert_eq!(prefs.entry_count, 1);
}

#[tokio::test]
async fn journal_no_is_an_answer_not_an_exit() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["note that the plumber comes friday", "no", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[2], "Okay, I won't save that.");
    assert!(!storage.exists(journal::ENTRIES_FILE).await.unwrap());
}

#[tokio::test]
async fn journal_delete_last_entry() {
    let storage = MemoryStorage::new();
    storage
        .write(
            journal::ENTRIES_FILE,
            "2026-01-01 09:00 | Ran 5k\n2026-01-02 09:00 | Rest day\n",
        )
        .await
        .unwrap();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["delete my last entry", "yes", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[1], "Delete your last entry: Rest day?");
    assert_eq!(spoken[2], "Deleted your last entry.");
    let raw = storage.read(journal::ENTRIES_FILE).await.unwrap();
    assert_eq!(raw.trim_end(), "2026-01-01 09:00 | Ran 5k");
}

const THREE_ENTRIES: &str =
    "2026-01-01 09:00 | Ran 5k\n2026-01-02 09:00 | Rest day\n2026-01-03 09:00 | Ran 10k\n";

async fn journal_with(entries: &str) -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.write(journal::ENTRIES_FILE, entries).await.unwrap();
    storage
}

#[tokio::test]
async fn journal_keyword_inside_a_word_is_ignored() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["Paddy called, add dinner on Friday", "yes", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[1], "I'll save: dinner on Friday. Should I save it?");
    assert_eq!(spoken[2], "Saved.");
    let raw = storage.read(journal::ENTRIES_FILE).await.unwrap();
    assert!(raw.trim_end().ends_with(" | dinner on Friday"), "{raw}");
}

#[tokio::test]
async fn journal_unclear_confirmation_asks_again_then_drops() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["add bought milk", "maybe", "perhaps later", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[1], "I'll save: bought milk. Should I save it?");
    assert_eq!(spoken[2], "Sorry, was that a yes or a no?");
    assert_eq!(spoken[3], "I'll leave that unsaved.");
    assert!(!storage.exists(journal::ENTRIES_FILE).await.unwrap());
}

#[tokio::test]
async fn journal_edit_last_entry_keeps_its_timestamp() {
    let storage = journal_with("2026-01-01 09:00 | Ran 5k\n2026-01-02 09:00 | Rest day\n").await;
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["edit my last entry", "Swam 2k instead", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[1], "What should your last entry say instead?");
    assert_eq!(spoken[2], "Updated your last entry.");
    let raw = storage.read(journal::ENTRIES_FILE).await.unwrap();
    assert_eq!(
        raw,
        "2026-01-01 09:00 | Ran 5k\n2026-01-02 09:00 | Swam 2k instead\n"
    );
}

#[tokio::test]
async fn journal_edit_entry_by_number() {
    let storage = journal_with("2026-01-01 09:00 | Ran 5k\n2026-01-02 09:00 | Rest day\n").await;
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["edit entry 2", "Ran 6k", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(
        spoken[1],
        "Editing on 2026-01-01, Ran 5k. What should it say instead?"
    );
    assert_eq!(spoken[2], "Updated that entry.");
    let raw = storage.read(journal::ENTRIES_FILE).await.unwrap();
    assert_eq!(raw, "2026-01-01 09:00 | Ran 6k\n2026-01-02 09:00 | Rest day\n");
}

#[tokio::test]
async fn journal_delete_picked_from_the_list() {
    let storage = journal_with(THREE_ENTRIES).await;
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["delete an entry", "number 2", "yes", "stop"]);

    let report = host
        .invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    assert_eq!(report.resume_calls, 1);
    let spoken = speech.spoken();
    assert_eq!(
        spoken[1],
        "Here are your recent entries. Number 1: on 2026-01-03, Ran 10k. \
         Number 2: on 2026-01-02, Rest day. Number 3: on 2026-01-01, Ran 5k. \
         Which number do you want to delete?"
    );
    assert_eq!(spoken[2], "Delete this entry: on 2026-01-02, Rest day?");
    assert_eq!(spoken[3], "Deleted that entry.");

    let raw = storage.read(journal::ENTRIES_FILE).await.unwrap();
    assert_eq!(raw, "2026-01-01 09:00 | Ran 5k\n2026-01-03 09:00 | Ran 10k\n");
    let prefs: journal::JournalPrefs = load_json(&storage, journal::PREFS_FILE).await.unwrap();
    assert_eq!(prefs.entry_count, 2);
}

#[tokio::test]
async fn journal_vague_pick_asks_the_model_for_a_number() {
    let storage = journal_with(THREE_ENTRIES).await;
    let model = ScriptedModel::new().when("pick an entry number", "3");
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new([
        "remove an entry",
        "the one from new year's day",
        "no",
        "stop",
    ]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(spoken[2], "Delete this entry: on 2026-01-01, Ran 5k?");
    assert_eq!(spoken[3], "Okay, I kept it.");
    assert_eq!(storage.read(journal::ENTRIES_FILE).await.unwrap(), THREE_ENTRIES);
}

#[tokio::test]
async fn journal_delete_all_after_confirmation() {
    let storage = journal_with(THREE_ENTRIES).await;
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["delete everything", "yes", "read my journal", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(
        spoken[1],
        "This will permanently delete all 3 entries. Are you sure?"
    );
    assert_eq!(spoken[2], "Done. Your journal has been cleared.");
    assert_eq!(spoken[3], "Your journal is empty.");
    assert!(!storage.exists(journal::ENTRIES_FILE).await.unwrap());
    let prefs: journal::JournalPrefs = load_json(&storage, journal::PREFS_FILE).await.unwrap();
    assert_eq!(prefs.entry_count, 0);
}

#[tokio::test]
async fn journal_delete_all_declined_keeps_entries() {
    let storage = journal_with(THREE_ENTRIES).await;
    let host = host(ScriptedModel::new(), &storage);
    let speech = ScriptedSpeech::new(["clear my journal", "no", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    assert_eq!(speech.spoken()[2], "Okay, your entries are safe.");
    assert_eq!(storage.read(journal::ENTRIES_FILE).await.unwrap(), THREE_ENTRIES);
}

#[tokio::test]
async fn journal_search_inline_and_asked() {
    let storage = journal_with(THREE_ENTRIES).await;
    let model = ScriptedModel::new().when(r#"said: "look something up""#, r#"{"intent": "search"}"#);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["search for ran", "look something up", "rest", "stop"]);

    host.invoke(journal::ID, Arc::new(speech.clone()), "journal")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(
        spoken[1],
        "I found 2 entries mentioning ran: on 2026-01-03, Ran 10k; on 2026-01-01, Ran 5k."
    );
    assert_eq!(spoken[2], "What should I search for?");
    assert_eq!(
        spoken[3],
        "I found 1 entry mentioning rest: on 2026-01-02, Rest day."
    );
    assert_eq!(storage.read(journal::ENTRIES_FILE).await.unwrap(), THREE_ENTRIES);
}

#[tokio::test]
async fn journal_remembers_the_name_it_is_given() {
    let storage = MemoryStorage::new();
    let host = host(ScriptedModel::new(), &storage);
    let first = ScriptedSpeech::new(["call me sam", "stop"]);

    host.invoke(journal::ID, Arc::new(first.clone()), "journal")
        .await
        .unwrap();
    assert_eq!(first.spoken()[1], "Nice to meet you, Sam.");
    let prefs: journal::JournalPrefs = load_json(&storage, journal::PREFS_FILE).await.unwrap();
    assert_eq!(prefs.name.as_deref(), Some("Sam"));

    let second = ScriptedSpeech::new(["stop"]);
    host.invoke(journal::ID, Arc::new(second.clone()), "journal")
        .await
        .unwrap();
    assert_eq!(
        second.spoken()[0],
        "Hi Sam, your journal is open. What would you like to do?"
    );
    assert!(!storage.exists(journal::ENTRIES_FILE).await.unwrap());
}

// ═══════════════════════════════════════════════════════════════════════
//  Unit converter
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn converter_answers_the_trigger_then_exits_on_no() {
    let storage = MemoryStorage::new();
    let model = ScriptedModel::new().when(
        "extract the unit conversion",
        r#"{"value": 5, "from": "mi", "to": "km"}"#,
    );
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["no thanks"]);

    let report = host
        .handle_utterance("convert 5 miles to kilometers", Arc::new(speech.clone()))
        .await
        .unwrap()
        .expect("converter should match");

    assert_eq!(report.ability, converter::ID);
    assert_eq!(report.resume_calls, 1);
    assert_eq!(
        speech.spoken(),
        vec![
            "5 miles is about 8.05 kilometers.".to_string(),
            "Anything else to convert?".to_string(),
            "Goodbye!".to_string(),
        ]
    );
}

#[tokio::test]
async fn converter_asks_the_model_outside_its_table() {
    let storage = MemoryStorage::new();
    let model = ScriptedModel::new()
        .when(
            "extract the unit conversion",
            r#"{"value": 3, "from": "furlong", "to": "m"}"#,
        )
        .when(
            "answer this unit conversion question",
            "Three furlongs is about 604 meters.",
        );
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["how many meters in three furlongs", "done"]);

    host.invoke(converter::ID, Arc::new(speech.clone()), "unit converter")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(
        &spoken[..3],
        &[
            "Unit converter ready. What would you like to convert?".to_string(),
            "Three furlongs is about 604 meters.".to_string(),
            "Anything else to convert?".to_string(),
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Trivia
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn trivia_round_with_score() {
    let storage = MemoryStorage::new();
    let model =
        ScriptedModel::new().when("generate a random multiple choice trivia question", SATURN);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["yes", "b", "no"]);

    let report = host
        .invoke(trivia::ID, Arc::new(speech.clone()), "trivia")
        .await
        .unwrap();

    assert_eq!(report.resume_calls, 1);
    assert_eq!(
        speech.spoken(),
        vec![
            "Welcome to Open Trivia. Ready to test your knowledge?".to_string(),
            "Which planet has the most moons? A. Mars. B. Saturn. C. Venus. D. Mercury. \
             Please say A, B, C, or D."
                .to_string(),
            "That's right! Saturn has over 140 known moons.".to_string(),
            "Would you like another question? Please say yes or no.".to_string(),
            "Thanks for playing Open Trivia. You got 1 of 1 right.".to_string(),
        ]
    );
}

#[tokio::test]
async fn trivia_wrong_answer_via_model_then_quit() {
    let storage = MemoryStorage::new();
    let model = ScriptedModel::new()
        .when("generate a random multiple choice trivia question", SATURN)
        // The letter prompt also quotes the player, so it must match first.
        .when("which option did they choose", "A")
        .when(r#"said: "the red planet""#, r#"{"intent": "answer"}"#);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["sure", "the red planet", "stop"]);

    host.invoke(trivia::ID, Arc::new(speech.clone()), "quiz me")
        .await
        .unwrap();

    let spoken = speech.spoken();
    assert_eq!(
        spoken[2],
        "Not quite. The answer was B. Saturn. Saturn has over 140 known moons."
    );
    assert_eq!(
        spoken.last().map(String::as_str),
        Some("Thanks for playing Open Trivia. You got 0 of 1 right.")
    );
}

#[tokio::test]
async fn trivia_goodbye_during_a_question_ends_the_session() {
    let storage = MemoryStorage::new();
    let model =
        ScriptedModel::new().when("generate a random multiple choice trivia question", SATURN);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["yes", "goodbye"]);

    let report = host
        .invoke(trivia::ID, Arc::new(speech.clone()), "trivia")
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.resume_calls, 1);
    assert_eq!(speech.listens(), 2);
    assert_eq!(
        speech.spoken().last().map(String::as_str),
        Some("Thanks for playing Open Trivia.")
    );
}

#[tokio::test]
async fn trivia_thats_all_after_an_answer_reports_the_score() {
    let storage = MemoryStorage::new();
    let model =
        ScriptedModel::new().when("generate a random multiple choice trivia question", SATURN);
    let host = host(model, &storage);
    let speech = ScriptedSpeech::new(["yes", "b", "that's all"]);

    let report = host
        .invoke(trivia::ID, Arc::new(speech.clone()), "trivia")
        .await
        .unwrap();

    assert_eq!(report.resume_calls, 1);
    assert_eq!(speech.listens(), 3);
    assert_eq!(
        speech.spoken().last().map(String::as_str),
        Some("Thanks for playing Open Trivia. You got 1 of 1 right.")
    );
}
