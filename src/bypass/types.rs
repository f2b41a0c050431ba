use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Outcome of one bypass invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BypassResult {
    /// Payload exactly as the bypass service returned it
    pub raw_payload: Value,

    /// URL normalized from the payload, `None` if the shape was unrecognized
    pub resolved_url: Option<String>,

    /// True when the result came from a polled long-lived task
    pub is_async_task: bool,

    /// Identifier of the long-lived task, if one was started
    pub task_id: Option<String>,

    /// Key scraped from the result page, if the URL pointed at one
    pub key: Option<String>,
}

/// Status of a long-lived bypass task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    /// Missing, non-string, or not a status this client knows
    Unknown,
}

impl TaskStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "QUEUED" => Self::Queued,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Returns true if polling should stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// One status report of a long-lived task
///
/// Only `status` decides what happens next. The other fields are read
/// without type checks, and the body is kept as sent for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct PollTask {
    pub status: TaskStatus,

    /// `progress` in whatever type the service reported it
    pub progress: Option<Value>,

    /// Final payload, present once the task is `COMPLETED`
    pub result: Option<Value>,

    /// The status body exactly as received
    pub raw: Value,
}

impl PollTask {
    pub fn from_value(raw: Value) -> Self {
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .map_or(TaskStatus::Unknown, TaskStatus::parse);
        let progress = present(&raw, "progress");
        let result = present(&raw, "result");

        Self {
            status,
            progress,
            result,
            raw,
        }
    }
}

fn present(raw: &Value, field: &str) -> Option<Value> {
    raw.get(field).filter(|v| !v.is_null()).cloned()
}

/// Response of the bypass start call
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartResponse {
    #[serde(rename = "isLongLivedToken", default)]
    pub is_long_lived_token: bool,

    /// The final payload for immediate results, the task id otherwise
    #[serde(default)]
    pub data: Value,
}

impl StartResponse {
    /// Task identifier carried in `data` for long-lived tokens
    pub fn task_id(&self) -> Option<String> {
        match &self.data {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        let task = PollTask::from_value(json!({"status": "IN_PROGRESS", "progress": 40}));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.progress, Some(json!(40)));
        assert!(task.result.is_none());
    }

    #[test]
    fn test_unknown_status() {
        let task = PollTask::from_value(json!({"status": "PAUSED"}));
        assert_eq!(task.status, TaskStatus::Unknown);
        assert!(!task.status.is_terminal());

        assert_eq!(PollTask::from_value(json!({"status": 3})).status, TaskStatus::Unknown);
        assert_eq!(PollTask::from_value(json!([])).status, TaskStatus::Unknown);
    }

    #[test]
    fn test_off_type_fields_keep_status() {
        let body = json!({"status": "COMPLETED", "progress": "100", "result": {"url": "https://z"}});
        let task = PollTask::from_value(body.clone());
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, Some(json!("100")));
        assert_eq!(task.result, Some(json!({"url": "https://z"})));
        assert_eq!(task.raw, body);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
    }

    #[test]
    fn test_start_response_task_id() {
        let start: StartResponse =
            serde_json::from_value(json!({"isLongLivedToken": true, "data": "task-1"})).unwrap();
        assert_eq!(start.task_id().as_deref(), Some("task-1"));

        let numeric: StartResponse =
            serde_json::from_value(json!({"isLongLivedToken": true, "data": 77})).unwrap();
        assert_eq!(numeric.task_id().as_deref(), Some("77"));

        let missing: StartResponse =
            serde_json::from_value(json!({"isLongLivedToken": true})).unwrap();
        assert_eq!(missing.task_id(), None);
    }

    #[test]
    fn test_start_response_defaults_to_immediate() {
        let start: StartResponse = serde_json::from_value(json!({"data": "https://x"})).unwrap();
        assert!(!start.is_long_lived_token);
    }
}
