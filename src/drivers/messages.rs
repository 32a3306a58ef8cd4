use serde::Deserialize;
use serde_json::Value;
use crate::utils::formatting::clock;

pub const EXECUTION_COMPLETE_TYPE: &str = "execution-complete";
pub const METRIC_PLACEHOLDER: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Running,
    Completed,
    Error,
}

impl MessageStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressMessage {
    pub timestamp: String,
    pub agent_id: String,
    pub agent_name: String,
    pub action: String,
    pub message: String,
    pub status: MessageStatus,
}

impl ProgressMessage {
    pub fn label(&self) -> String {
        format!("{}: {}", self.agent_name, self.action)
    }

    pub fn log_line(&self) -> String {
        let body = if self.message.is_empty() { &self.action } else { &self.message };
        match self.status {
            MessageStatus::Error => format!("[{}] [{}] ERROR: {}", self.timestamp, self.agent_name, body),
            _ => format!("[{}] [{}] {}", self.timestamp, self.agent_name, body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionResults {
    pub efficiency: Option<String>,
    pub accuracy: Option<String>,
    pub time_saved: Option<String>,
}

impl CompletionResults {
    /// Summary lines in reading order.
    pub fn summary_lines(&self, clock: &str) -> Vec<String> {
        let metric = |v: &Option<String>| v.clone().unwrap_or_else(|| METRIC_PLACEHOLDER.to_string());
        vec![
            format!("[{}] [System] Workflow execution complete", clock),
            format!("[{}] [System] Efficiency: {}", clock, metric(&self.efficiency)),
            format!("[{}] [System] Accuracy: {}", clock, metric(&self.accuracy)),
            format!("[{}] [System] Time saved: {}", clock, metric(&self.time_saved)),
        ]
    }
}

/// Inbound stream message after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveMessage {
    Progress(ProgressMessage),
    Complete(CompletionResults),
    Malformed(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    timestamp: Option<Value>,
    agent_id: Option<String>,
    agent_name: Option<String>,
    action: Option<String>,
    message: Option<String>,
    status: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    results: Option<Value>,
}

pub fn parse(text: &str) -> LiveMessage {
    let raw: RawMessage = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => return LiveMessage::Malformed(format!("unparsable payload: {}", e)),
    };

    if raw.kind.as_deref() == Some(EXECUTION_COMPLETE_TYPE) {
        return LiveMessage::Complete(parse_results(raw.results.as_ref()));
    }

    let agent_id = raw.agent_id.filter(|s| !s.is_empty());
    let action = raw.action.filter(|s| !s.is_empty());
    let (agent_id, action) = match (agent_id, action) {
        (Some(agent_id), Some(action)) => (agent_id, action),
        _ => {
            return LiveMessage::Malformed(format!(
                "message without agentId/action (type: {})",
                raw.kind.as_deref().unwrap_or("none")
            ))
        }
    };

    let status = match raw.status.as_deref() {
        None => MessageStatus::Running,
        Some(s) => match MessageStatus::parse(s) {
            Some(status) => status,
            None => return LiveMessage::Malformed(format!("unknown status '{}'", s)),
        },
    };

    LiveMessage::Progress(ProgressMessage {
        timestamp: raw.timestamp.as_ref().map(render_value).unwrap_or_else(clock),
        agent_name: raw.agent_name.unwrap_or_else(|| agent_id.clone()),
        agent_id,
        action,
        message: raw.message.unwrap_or_default(),
        status,
    })
}

fn parse_results(results: Option<&Value>) -> CompletionResults {
    let field = |key: &str| {
        results
            .and_then(|r| r.get(key))
            .filter(|v| !v.is_null())
            .map(render_value)
    };
    CompletionResults {
        efficiency: field("efficiency"),
        accuracy: field("accuracy"),
        time_saved: field("timeSaved"),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress() {
        let msg = parse(r#"{"timestamp":"12:00:01","agentId":"a1","agentName":"Reader","action":"Reading","message":"Opened file","status":"running"}"#);
        match msg {
            LiveMessage::Progress(p) => {
                assert_eq!(p.agent_id, "a1");
                assert_eq!(p.status, MessageStatus::Running);
                assert_eq!(p.label(), "Reader: Reading");
                assert_eq!(p.log_line(), "[12:00:01] [Reader] Opened file");
            }
            other => panic!("expected progress, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_completion_with_results() {
        let msg = parse(r#"{"type":"execution-complete","results":{"efficiency":"92%","accuracy":0.97}}"#);
        let LiveMessage::Complete(results) = msg else { panic!("expected completion") };
        assert_eq!(results.efficiency.as_deref(), Some("92%"));
        assert_eq!(results.accuracy.as_deref(), Some("0.97"));
        assert_eq!(results.time_saved, None);
        let lines = results.summary_lines("t");
        assert_eq!(lines[3], "[t] [System] Time saved: n/a");
    }

    #[test]
    fn test_completion_type_wins_over_agent_fields() {
        let msg = parse(r#"{"type":"execution-complete","agentId":"a1","action":"x","status":"completed"}"#);
        assert!(matches!(msg, LiveMessage::Complete(_)));
    }

    #[test]
    fn test_missing_action_is_malformed() {
        assert!(matches!(parse(r#"{"agentId":"a1","status":"completed"}"#), LiveMessage::Malformed(_)));
        assert!(matches!(parse(r#"{"agentId":"","action":"x"}"#), LiveMessage::Malformed(_)));
        assert!(matches!(parse(r#"{"type":"heartbeat"}"#), LiveMessage::Malformed(_)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(parse("not json"), LiveMessage::Malformed(_)));
        assert!(matches!(parse(r#"{"agentId": 5, "action": "x"}"#), LiveMessage::Malformed(_)));
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        assert!(matches!(parse(r#"{"agentId":"a1","action":"x","status":"paused"}"#), LiveMessage::Malformed(_)));
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let LiveMessage::Progress(p) = parse(r#"{"agentId":"a1","action":"Scanning","timestamp":1700000000}"#) else {
            panic!("expected progress")
        };
        assert_eq!(p.status, MessageStatus::Running);
        assert_eq!(p.agent_name, "a1");
        assert_eq!(p.timestamp, "1700000000");
        assert_eq!(p.log_line(), "[1700000000] [a1] Scanning");
    }

    #[test]
    fn test_error_status_log_line() {
        let LiveMessage::Progress(p) = parse(r#"{"timestamp":"t","agentId":"a1","agentName":"R","action":"x","message":"boom","status":"error"}"#) else {
            panic!("expected progress")
        };
        assert_eq!(p.log_line(), "[t] [R] ERROR: boom");
    }
}
