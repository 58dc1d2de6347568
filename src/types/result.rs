//! Finalized task outcomes recorded in the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Task;

/// Three-tier outcome of a threshold evaluation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Fail = 0,
    Warn = 1,
    Pass = 2,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Pass => "pass",
            ResultStatus::Warn => "warn",
            ResultStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultStatus::Pass => write!(f, "PASS"),
            ResultStatus::Warn => write!(f, "WARN"),
            ResultStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// One finalized outcome. Immutable once created.
///
/// Results are never merged or deduplicated by content, so `id` is a random
/// UUID rather than anything derived from the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub task: Task,
    pub value: f64,
    pub units: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TaskResult {
    /// Create a result stamped with a fresh id and the current time.
    pub fn new(
        task: Task,
        value: f64,
        units: impl Into<String>,
        status: ResultStatus,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            task,
            value,
            units: units.into(),
            status,
            note,
        }
    }
}
