//! In-memory capture of tracing events.
//!
//! [`EventCaptureLayer`] records every event together with the name and
//! fields of its enclosing span, so tests can assert on structured log output
//! such as `degraded = true` without parsing formatted text.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Event, Id, Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// A single captured tracing event
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    pub message: String,
    /// Name of the innermost span the event was emitted in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    /// Event fields merged over the fields of its enclosing spans
    pub fields: HashMap<String, serde_json::Value>,
    /// Nanoseconds since the Unix epoch
    pub timestamp: u128,
}

impl CapturedEvent {
    /// Whether the event carries `key` with the given JSON value
    pub fn has_field(&self, key: &str, value: &serde_json::Value) -> bool {
        self.fields.get(key) == Some(value)
    }

    /// Whether the event is at `level` or more severe.
    pub fn is_at_least(&self, level: Level) -> bool {
        // tracing orders levels by verbosity: ERROR < WARN < INFO
        self.level.parse::<Level>().map(|l| l <= level).unwrap_or(false)
    }
}

/// Shared storage for captured events
#[derive(Debug, Clone, Default)]
pub struct SharedEventStorage {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl SharedEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every event captured so far, in emission order.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events whose `key` field equals `value`
    pub fn events_with_field(&self, key: &str, value: serde_json::Value) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.has_field(key, &value)).collect()
    }

    /// Append an event. A poisoned lock drops the event rather than panicking.
    pub fn add_event(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }

    /// Discard all captured events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

/// A tracing layer that captures events in memory
pub struct EventCaptureLayer {
    storage: SharedEventStorage,
}

impl EventCaptureLayer {
    /// Create a layer writing into `storage`.
    pub fn new(storage: SharedEventStorage) -> Self {
        Self { storage }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

impl<S> Layer<S> for EventCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        // Inherit fields from the parent span unless overridden
        if let Some(parent) = span.parent() {
            if let Some(parent_fields) = parent.extensions().get::<SpanFields>() {
                for (k, v) in &parent_fields.0 {
                    fields.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;
        let message = fields
            .remove("message")
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default();

        let span = ctx.event_span(event);
        if let Some(span) = &span {
            if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                for (k, v) in &span_fields.0 {
                    fields.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        let metadata = event.metadata();
        self.storage.add_event(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            span: span.map(|s| s.name().to_string()),
            fields,
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn captures_events_with_span_fields() {
        let storage = SharedEventStorage::new();
        let subscriber =
            tracing_subscriber::registry().with(EventCaptureLayer::new(storage.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("retrieval.perform", project_id = "p1");
            let _guard = span.enter();
            tracing::warn!(degraded = true, selected = 3u64, "served retrieval from fallback");
        });

        let events = storage.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.message, "served retrieval from fallback");
        assert_eq!(event.span.as_deref(), Some("retrieval.perform"));
        assert!(event.has_field("project_id", &serde_json::json!("p1")));
        assert!(event.has_field("selected", &serde_json::json!(3)));
        assert!(event.is_at_least(Level::WARN));
        assert!(!event.is_at_least(Level::ERROR));

        assert_eq!(storage.events_with_field("degraded", serde_json::json!(true)).len(), 1);
        storage.clear();
        assert!(storage.events().is_empty());
    }
}
