//! Integration tests for the ability-kernel crate.
//!
//! These exercise the trigger gate, ability registry, and session task
//! facility the way the host uses them together.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ability_kernel::{
    AbilityRegistry, AbilityStatus, KernelError, SessionTasks, TaskState, TriggerGate,
    TriggerMatch,
};

// ═══════════════════════════════════════════════════════════════════════
//  Gate + registry
// ═══════════════════════════════════════════════════════════════════════

fn host_fixture() -> (TriggerGate, AbilityRegistry) {
    let mut gate = TriggerGate::new();
    let registry = AbilityRegistry::new();

    let abilities: [(&str, &[&str]); 3] = [
        ("grocery-list", &["grocery list", "shopping list"]),
        ("weather", &["weather", "forecast"]),
        ("trivia", &["trivia", "quiz me"]),
    ];

    for (id, hotwords) in abilities {
        gate.add_hotwords(hotwords.iter().copied(), id).unwrap();
        registry.register(id, "", hotwords.iter().map(|h| h.to_string()).collect());
    }
    (gate, registry)
}

#[test]
fn utterances_route_to_registered_abilities() {
    let (gate, registry) = host_fixture();

    let cases = [
        ("What's on my shopping list?", Some("grocery-list")),
        ("give me the forecast", Some("weather")),
        ("quiz me on history", Some("trivia")),
        ("play some music", None),
    ];

    for (utterance, expected) in cases {
        let resolved = gate.resolve(utterance);
        assert_eq!(resolved.ability(), expected, "utterance: {utterance}");
        if let Some(id) = resolved.ability() {
            registry.ensure_available(id).unwrap();
        }
    }
}

#[test]
fn disabled_ability_still_routes_but_is_refused() {
    let (gate, registry) = host_fixture();
    registry.set_status("trivia", AbilityStatus::Disabled).unwrap();

    let resolved = gate.resolve("trivia time");
    assert!(matches!(resolved, TriggerMatch::Hotword { .. }));
    let err = registry.ensure_available(resolved.ability().unwrap());
    assert!(matches!(err, Err(KernelError::AbilityUnavailable { .. })));
}

// ═══════════════════════════════════════════════════════════════════════
//  Session tasks
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn closing_a_session_tears_down_background_work() {
    let tasks = SessionTasks::new("session-a");
    let ticks = Arc::new(AtomicU32::new(0));

    let mut ids = Vec::new();
    for i in 0..3 {
        let ticks = Arc::clone(&ticks);
        let id = tasks
            .spawn(format!("ticker-{i}"), async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .unwrap();
        ids.push(id);
    }

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(tasks.active_count(), 3);
    assert_eq!(tasks.close(), 3);

    let after_close = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    // At most one in-flight tick per task can land after abort is requested.
    assert!(ticks.load(Ordering::SeqCst) <= after_close + 3);

    for id in ids {
        assert_eq!(tasks.state(id).unwrap(), TaskState::Aborted);
    }
}

#[tokio::test]
async fn dropping_the_last_handle_aborts_tasks() {
    let finished = Arc::new(AtomicU32::new(0));
    {
        let tasks = SessionTasks::new("session-b");
        let finished = Arc::clone(&finished);
        tasks
            .spawn("late", async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}
