#![forbid(unsafe_code)]

//! Log event policy for the session.
//!
//! - Winner selection, mode switches, and reset log at INFO with fields
//! - Contact bookkeeping logs at DEBUG under `turnorder.contact`
//! - Every event uses a `turnorder.*` target
//! - Entry points run inside a `session.op` span
//!
//! Run:
//!   cargo test -p turnorder-core --test tracing_capture

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use turnorder_core::logging::{ALL_TARGETS, TARGET_CONTACT, TARGET_MODE, TARGET_SELECTION};
use turnorder_core::{
    ContactId, MemoryModeStore, Mode, PickerConfig, Position, ScriptedRandom, Session, SizeHint,
};

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
    parent_span: Option<String>,
}

impl CapturedEvent {
    fn message(&self) -> &str {
        self.fields.get("message").map_or("", String::as_str)
    }
}

#[derive(Default)]
struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let parent_span = ctx
            .event_span(event)
            .map(|span| span.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
            parent_span,
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn selection_run() {
    let mut s = Session::new(
        PickerConfig::default(),
        Box::new(MemoryModeStore::new()),
        ScriptedRandom::new([1]),
    )
    .unwrap();
    s.request_mode(Mode::ContactPick);
    s.on_contact_start(ContactId(1), Position::new(0.0, 0.0), None)
        .unwrap();
    s.on_contact_start(ContactId(2), Position::new(90.0, 0.0), None)
        .unwrap();
    let _ = s.on_contact_start(
        ContactId(3),
        Position::new(0.0, 0.0),
        Some(SizeHint::new(500.0, 500.0)),
    );
    s.on_contact_move(ContactId(1), Position::new(4.0, 4.0));
    s.frame();
    s.advance_by(Duration::from_millis(2_000));
    s.reset();
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn winner_selection_logs_info_with_fields() {
    let events = with_captured_events(selection_run);
    let winner: Vec<_> = events
        .iter()
        .filter(|e| e.target == TARGET_SELECTION && e.level == tracing::Level::INFO)
        .collect();
    assert_eq!(winner.len(), 1, "{events:#?}");
    assert_eq!(winner[0].fields.get("winner").map(String::as_str), Some("2"));
    assert_eq!(winner[0].fields.get("candidates").map(String::as_str), Some("2"));
    assert!(winner[0].fields.contains_key("secure"));
}

#[test]
fn mode_switch_logs_info() {
    let events = with_captured_events(selection_run);
    let switched = events
        .iter()
        .find(|e| e.target == TARGET_MODE && e.message() == "mode switched")
        .expect("mode switch event");
    assert_eq!(switched.level, tracing::Level::INFO);
    assert_eq!(switched.fields.get("to").map(String::as_str), Some("contact-pick"));
    assert_eq!(switched.parent_span.as_deref(), Some("session.op"));
}

#[test]
fn contact_bookkeeping_logs_at_debug() {
    let events = with_captured_events(selection_run);
    let contact: Vec<_> = events.iter().filter(|e| e.target == TARGET_CONTACT).collect();
    assert!(contact.iter().any(|e| e.message() == "contact added"));
    let ignored = contact
        .iter()
        .find(|e| e.message() == "contact ignored")
        .expect("palm rejection logged");
    assert_eq!(ignored.level, tracing::Level::DEBUG);
    assert_eq!(ignored.fields.get("reason").map(String::as_str), Some("palm_rejected"));
    assert!(
        contact
            .iter()
            .all(|e| e.level == tracing::Level::DEBUG || e.level == tracing::Level::TRACE)
    );
}

#[test]
fn reset_logs_info() {
    let events = with_captured_events(selection_run);
    assert!(
        events
            .iter()
            .any(|e| e.level == tracing::Level::INFO && e.message() == "session reset")
    );
}

#[test]
fn every_event_uses_an_engine_target() {
    let events = with_captured_events(selection_run);
    assert!(!events.is_empty());
    for event in &events {
        assert!(
            ALL_TARGETS.contains(&event.target.as_str()),
            "unexpected target {}",
            event.target
        );
    }
}

#[test]
fn no_warnings_on_a_healthy_run() {
    let events = with_captured_events(selection_run);
    assert!(
        events
            .iter()
            .all(|e| e.level != tracing::Level::WARN && e.level != tracing::Level::ERROR)
    );
}
