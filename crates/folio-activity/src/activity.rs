//! Activity feed records.
//!
//! Only `timestamp` is interpreted. Every other field, including unknown
//! ones, is kept as received and serialized back unchanged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Default number of activities requested.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;

/// Activity identifier, sent by the server as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityId {
    Text(String),
    Number(Number),
}

impl ActivityId {
    /// The identifier when it was sent as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for ActivityId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for ActivityId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<u64> for ActivityId {
    fn from(id: u64) -> Self {
        Self::Number(Number::from(id))
    }
}

/// One entry of the live activity feed. Passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    /// Activity kind, e.g. `commit` or `deploy`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Opaque extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Fields this client does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parameters of an activity feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityQuery {
    /// Maximum number of activities to keep, newest first.
    pub limit: usize,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

impl ActivityQuery {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }
}

/// Accepted response bodies: `{"activities": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ActivityFeedBody {
    Wrapped { activities: Vec<Activity> },
    Bare(Vec<Activity>),
}

impl ActivityFeedBody {
    pub(crate) fn into_activities(self) -> Vec<Activity> {
        match self {
            Self::Wrapped { activities } | Self::Bare(activities) => activities,
        }
    }
}

/// Sort newest first and keep at most `limit`.
pub fn newest_first(mut activities: Vec<Activity>, limit: usize) -> Vec<Activity> {
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activities.truncate(limit);
    activities
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    const WRAPPED: &str = r#"{
        "activities": [
            {
                "id": "a1",
                "type": "commit",
                "description": "Refine hero layout",
                "projectName": "folio",
                "timestamp": "2024-03-01T10:00:00Z",
                "metadata": {"sha": "4f2a9c1"}
            },
            {
                "id": "a2",
                "type": "deploy",
                "description": "Ship v2",
                "projectName": "atlas",
                "timestamp": "2024-03-02T08:30:00Z"
            }
        ]
    }"#;

    #[test]
    fn test_wrapped_and_bare_bodies() -> TestResult {
        let wrapped: ActivityFeedBody = serde_json::from_str(WRAPPED)?;
        let activities = wrapped.into_activities();
        assert_eq!(activities.len(), 2);

        let bare_json = serde_json::to_string(&activities)?;
        let bare: ActivityFeedBody = serde_json::from_str(&bare_json)?;
        assert_eq!(bare.into_activities(), activities);
        Ok(())
    }

    #[test]
    fn test_field_mapping() -> TestResult {
        let body: ActivityFeedBody = serde_json::from_str(WRAPPED)?;
        let activities = body.into_activities();
        let [first, second] = activities.as_slice() else {
            return Err("expected two activities".into());
        };
        assert_eq!(first.kind, "commit");
        assert_eq!(first.project_name.as_deref(), Some("folio"));
        assert!(first.metadata.is_some());
        assert_eq!(second.metadata, None);
        Ok(())
    }

    #[test]
    fn test_newest_first_truncates() -> TestResult {
        let body: ActivityFeedBody = serde_json::from_str(WRAPPED)?;
        let shaped = newest_first(body.into_activities(), 1);
        let [only] = shaped.as_slice() else {
            return Err("expected one activity".into());
        };
        assert_eq!(only.id.as_str(), Some("a2"));
        Ok(())
    }

    #[test]
    fn test_unknown_fields_round_trip() -> TestResult {
        let raw = serde_json::json!({
            "id": "a3",
            "type": "release",
            "description": "Tag v3",
            "projectName": "folio",
            "timestamp": "2024-03-03T12:00:00Z",
            "url": "https://example.com/releases/v3",
            "author": {"name": "sam"}
        });
        let activity: Activity = serde_json::from_value(raw.clone())?;
        assert_eq!(
            activity.extra.get("url"),
            Some(&Value::from("https://example.com/releases/v3"))
        );
        assert_eq!(serde_json::to_value(&activity)?, raw);
        Ok(())
    }

    #[test]
    fn test_loose_items_still_decode() -> TestResult {
        let body: ActivityFeedBody = serde_json::from_str(
            r#"[
                {"id": 42, "type": "commit", "timestamp": "2024-03-01T10:00:00Z"},
                {"id": "b7", "timestamp": "2024-03-02T10:00:00Z"}
            ]"#,
        )?;
        let activities = body.into_activities();
        let [numeric, minimal] = activities.as_slice() else {
            return Err("expected two activities".into());
        };
        assert_eq!(numeric.id, ActivityId::from(42_u64));
        assert_eq!(numeric.id.to_string(), "42");
        assert_eq!(numeric.project_name, None);
        assert_eq!(minimal.id.as_str(), Some("b7"));
        assert!(minimal.kind.is_empty());
        Ok(())
    }
}
