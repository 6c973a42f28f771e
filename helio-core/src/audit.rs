//! Audit trail event types.
//!
//! Events are immutable once built and describe one attempted action: what
//! was attempted, on which resource, by whom, and how it ended.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::field_map::FieldMap;
use crate::Timestamp;

/// Placeholder recorded when the client address or user agent is unknown.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DownloadReport,
    CheckAvailability,
    ClearCache,
    ClearAllCache,
    DeleteData,
    ExportData,
    RateLimited,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::DownloadReport => "download_report",
            AuditAction::CheckAvailability => "check_availability",
            AuditAction::ClearCache => "clear_cache",
            AuditAction::ClearAllCache => "clear_all_cache",
            AuditAction::DeleteData => "delete_data",
            AuditAction::ExportData => "export_data",
            AuditAction::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub client_addr: String,
    pub user_agent: String,
}

impl Actor {
    pub fn new(client_addr: Option<String>, user_agent: Option<String>) -> Self {
        let or_anonymous = |value: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string())
        };
        Self {
            client_addr: or_anonymous(client_addr),
            user_agent: or_anonymous(user_agent),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None, None)
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// How the action ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditOutcome {
    /// HTTP status returned to the client.
    pub status: u16,
    /// Short machine-readable label such as `success` or `forbidden`.
    pub label: String,
}

impl AuditOutcome {
    pub fn success(status: u16) -> Self {
        Self {
            status,
            label: "success".to_string(),
        }
    }

    pub fn failure(status: u16, label: impl Into<String>) -> Self {
        Self {
            status,
            label: label.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: Timestamp,
    pub action: AuditAction,
    pub resource: String,
    pub actor: Actor,
    pub outcome: AuditOutcome,
    pub details: FieldMap,
}

impl AuditEvent {
    /// Start an event; the outcome defaults to 200 success.
    pub fn new(action: AuditAction, resource: impl Into<String>, actor: Actor) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            resource: resource.into(),
            actor,
            outcome: AuditOutcome::success(200),
            details: FieldMap::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key, value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_defaults_to_anonymous() {
        let actor = Actor::new(None, Some("  ".into()));
        assert_eq!(actor.client_addr, ANONYMOUS_ACTOR);
        assert_eq!(actor.user_agent, ANONYMOUS_ACTOR);
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(
            AuditAction::DownloadReport,
            "project/abc",
            Actor::new(Some("10.0.0.1".into()), Some("curl/8.0".into())),
        )
        .with_outcome(AuditOutcome::failure(403, "forbidden"))
        .with_detail("format", "summary");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "download_report");
        assert_eq!(json["actor"]["client_addr"], "10.0.0.1");
        assert_eq!(json["outcome"]["status"], 403);
        assert_eq!(json["details"]["format"], "summary");
        assert!(!event.outcome.is_success());
    }
}
