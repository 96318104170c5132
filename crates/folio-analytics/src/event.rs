//! Analytics events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type names emitted by the tracker helpers.
pub mod event_types {
    pub const PAGE_VIEW: &str = "page_view";
    pub const PROJECT_VIEW: &str = "project_view";
    pub const CONTACT_SUBMITTED: &str = "contact_submitted";
    pub const PERFORMANCE_ALERT: &str = "performance_alert";
    pub const QUALITY_CHANGED: &str = "quality_changed";
    pub const WEB_VITAL: &str = "web_vital";
}

/// Open key/value payload carried by an event.
pub type EventPayload = Map<String, Value>;

/// One tracked occurrence, queued for batched delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: EventPayload,
    enqueued_at_ms: u64,
}

impl TelemetryEvent {
    pub fn new(event_type: impl Into<String>, payload: EventPayload, enqueued_at_ms: u64) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            enqueued_at_ms,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Payload field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn enqueued_at_ms(&self) -> u64 {
        self.enqueued_at_ms
    }
}

/// Wire body posted by the HTTP transport.
#[derive(Debug, Serialize)]
pub(crate) struct BatchBody<'a> {
    pub(crate) events: &'a [TelemetryEvent],
}
