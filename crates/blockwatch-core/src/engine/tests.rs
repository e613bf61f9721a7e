use super::*;
use crate::error::BlockError;
use crate::event::EventKind;
use crate::policy::BlockPolicyStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const HOST: &str = "com.example.blockwatch";

fn store_with(pairs: &[(&str, &str)]) -> Arc<BlockPolicyStore> {
    let store = Arc::new(BlockPolicyStore::new());
    let entries: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    store.update_policy(Some(entries)).unwrap();
    store
}

fn engine_for(policy: Arc<dyn BlockPolicy>) -> BlockDecisionEngine {
    BlockDecisionEngine::new(
        ForegroundDebouncer::new(),
        ExemptionFilter::new(HOST),
        policy,
    )
}

fn wsc(app_id: &str, t: i64) -> ForegroundEvent {
    ForegroundEvent::window_state_changed(app_id, t)
}

/// Policy that always fails and counts how often it was asked
#[derive(Default)]
struct BrokenPolicy {
    lookups: AtomicUsize,
}

impl BlockPolicy for BrokenPolicy {
    fn lookup(&self, _app_id: &str) -> Result<Option<String>, BlockError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(BlockError::LookupFault("storage unavailable".to_string()))
    }
}

// ============================================================================
// Plan shape
// ============================================================================

#[test]
fn test_plan_has_fixed_order() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]));
    let plan = engine.handle_event(&wsc("com.game", 0)).unwrap();

    assert_eq!(
        plan.actions(),
        &[
            InterventionAction::GoHome,
            InterventionAction::ShowMessage {
                text: "\u{23f0} GameApp is blocked. You have reached your daily limit."
                    .to_string(),
            },
            InterventionAction::OpenRedirect {
                delay: Duration::from_millis(500),
                payload: RedirectPayload {
                    app_id: "com.game".to_string(),
                    display_name: "GameApp".to_string(),
                },
            },
        ]
    );
}

#[test]
fn test_custom_redirect_delay() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]))
        .with_redirect_delay(Duration::from_millis(50));
    let plan = engine.handle_event(&wsc("com.game", 0)).unwrap();

    assert!(matches!(
        plan.actions()[2],
        InterventionAction::OpenRedirect { delay, .. } if delay == Duration::from_millis(50)
    ));
}

// ============================================================================
// Pipeline stages
// ============================================================================

#[test]
fn test_other_events_are_discarded_without_touching_debounce() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]));
    let event = ForegroundEvent {
        app_id: "com.game".to_string(),
        timestamp_millis: 0,
        kind: EventKind::Other,
    };

    assert_eq!(engine.evaluate(&event), Decision::Discarded);
    assert!(engine.debouncer.state().is_none());

    // A real window change right after still gets through
    assert!(engine.handle_event(&wsc("com.game", 10)).is_some());
}

#[test]
fn test_empty_app_id_is_discarded() {
    let mut engine = engine_for(store_with(&[]));
    assert_eq!(engine.evaluate(&wsc("", 0)), Decision::Discarded);
    assert!(engine.debouncer.state().is_none());
}

#[test]
fn test_exempt_app_skips_lookup() {
    let policy = Arc::new(BrokenPolicy::default());
    let mut engine = engine_for(policy.clone());

    assert_eq!(engine.evaluate(&wsc(HOST, 0)), Decision::Exempt);
    assert_eq!(
        engine.evaluate(&wsc("com.android.systemui", 0)),
        Decision::Exempt
    );
    assert_eq!(
        engine.evaluate(&wsc("com.foo.launcher", 0)),
        Decision::Exempt
    );
    assert_eq!(policy.lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn test_exempt_even_when_blocklisted() {
    let mut engine = engine_for(store_with(&[("com.foo.launcher", "Launcher")]));
    assert!(engine.handle_event(&wsc("com.foo.launcher", 0)).is_none());
}

#[test]
fn test_unlisted_app_is_not_blocked() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]));
    assert_eq!(
        engine.evaluate(&wsc("com.other.app", 0)),
        Decision::NotBlocked
    );
}

#[test]
fn test_lookup_failure_fails_open() {
    let policy = Arc::new(BrokenPolicy::default());
    let mut engine = engine_for(policy.clone());

    assert_eq!(engine.evaluate(&wsc("com.game", 0)), Decision::NotBlocked);
    assert_eq!(policy.lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn test_not_blocked_app_is_still_debounced() {
    let policy = Arc::new(BrokenPolicy::default());
    let mut engine = engine_for(policy.clone());

    engine.evaluate(&wsc("com.other.app", 0));
    assert_eq!(
        engine.evaluate(&wsc("com.other.app", 1_000)),
        Decision::Debounced
    );
    assert_eq!(policy.lookups.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_debounced_event_stream() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]));

    let first = engine.handle_event(&wsc("com.game", 0)).unwrap();
    assert!(matches!(
        &first.actions()[1],
        InterventionAction::ShowMessage { text } if text.contains("GameApp")
    ));

    assert_eq!(engine.evaluate(&wsc("com.game", 500)), Decision::Debounced);
    assert!(engine.handle_event(&wsc("com.game", 2_500)).is_some());
}

#[test]
fn test_out_of_range_timestamp_from_feed_is_debounced() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]));
    assert!(engine.handle_event(&wsc("com.game", 1_000)).is_some());

    let line = r#"{"app_id":"com.game","timestamp_millis":-9223372036854775808,"kind":"window_state_changed"}"#;
    let event = ForegroundEvent::parse_line(line, 0).unwrap();
    assert_eq!(event.timestamp_millis, i64::MIN);
    assert_eq!(engine.evaluate(&event), Decision::Debounced);
}

#[test]
fn test_switching_away_and_back_blocks_again() {
    let mut engine = engine_for(store_with(&[("com.game", "GameApp")]));

    assert!(engine.handle_event(&wsc("com.game", 0)).is_some());
    assert!(engine.handle_event(&wsc("com.foo.launcher", 100)).is_none());
    assert!(engine.handle_event(&wsc("com.game", 200)).is_some());
}

#[test]
fn test_policy_update_between_events_is_visible() {
    let store = store_with(&[]);
    let mut engine = engine_for(store.clone());

    assert!(engine.handle_event(&wsc("com.game", 0)).is_none());

    let mut entries = HashMap::new();
    entries.insert("com.game".to_string(), "GameApp".to_string());
    store.update_policy(Some(entries)).unwrap();

    assert!(engine.handle_event(&wsc("com.game", 2_000)).is_some());

    store.clear_policy().unwrap();
    assert!(engine.handle_event(&wsc("com.game", 4_000)).is_none());
}

#[test]
fn test_policy_update_from_another_thread_is_visible() {
    let store = store_with(&[]);
    let mut engine = engine_for(store.clone());

    assert!(engine.handle_event(&wsc("com.game", 0)).is_none());

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            let mut entries = HashMap::new();
            entries.insert("com.game".to_string(), String::new());
            store.update_policy(Some(entries)).unwrap();
        })
    };
    writer.join().unwrap();

    let plan = engine.handle_event(&wsc("com.game", 5_000)).unwrap();
    assert!(matches!(
        &plan.actions()[2],
        InterventionAction::OpenRedirect { payload, .. }
            if payload.display_name == "this application"
    ));
}
