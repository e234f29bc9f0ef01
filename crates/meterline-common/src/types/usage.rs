//! Usage telemetry records emitted by the agent
//!
//! Both records are immutable once emitted and travel as JSON, first inside
//! an envelope and then verbatim on the durable logs.

use serde::{Deserialize, Serialize};

/// One resource-usage sample for a function instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Function instance (pod) name
    pub pod: String,
    /// CPU utilisation in percent
    pub cpu_percent: f64,
    /// Memory in use, MB
    pub mem_mb: f64,
    /// Sample time (Unix seconds)
    pub timestamp: i64,
    /// Owning tenant
    pub tenant: String,
}

impl Metric {
    /// Create a sample stamped with the current time
    pub fn new(pod: impl Into<String>, tenant: impl Into<String>, mem_mb: f64) -> Self {
        Self {
            pod: pod.into(),
            cpu_percent: 0.0,
            mem_mb,
            timestamp: unix_now(),
            tenant: tenant.into(),
        }
    }
}

/// Lifecycle action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Terminal action marking the end of the billable lifetime
    Stop,
    /// Any kind this build does not know about
    #[serde(other)]
    Unknown,
}

/// Lifecycle action for a function instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub pod: String,
    pub action: ActionKind,
    /// Unix seconds
    pub timestamp: i64,
    pub tenant: String,
}

impl Action {
    /// Create a stop action stamped with the current time
    pub fn stop(pod: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            action: ActionKind::Stop,
            timestamp: unix_now(),
            tenant: tenant.into(),
        }
    }

    pub fn is_stop(&self) -> bool {
        self.action == ActionKind::Stop
    }
}

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_wire_field_names() {
        let metric = Metric {
            pod: "fn-hello-00001".into(),
            cpu_percent: 0.0,
            mem_mb: 12.5,
            timestamp: 1_700_000_000,
            tenant: "acme".into(),
        };

        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["pod"], "fn-hello-00001");
        assert_eq!(value["mem_mb"], 12.5);
        assert_eq!(value["timestamp"], 1_700_000_000i64);
        assert_eq!(value["tenant"], "acme");
    }

    #[test]
    fn test_stop_action_serializes_lowercase() {
        let action = Action::stop("fn-hello-00001", "acme");
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains(r#""action":"stop""#));
        assert!(action.is_stop());
    }

    #[test]
    fn test_unknown_action_kind_still_decodes() {
        let json = r#"{"pod":"p","action":"scale","timestamp":1,"tenant":"t"}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.action, ActionKind::Unknown);
        assert!(!action.is_stop());
    }
}
