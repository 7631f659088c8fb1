use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single tool invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolUsageStatus {
    Success,
    Error,
}

/// Transparency record of one tool call, returned alongside the final answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolUsageEntry {
    pub tool_name: String,
    pub parameters: Value,
    pub timestamp: DateTime<Utc>,
    pub status: ToolUsageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolUsageEntry {
    pub fn success(tool_name: &str, parameters: Value, summary: String) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            parameters,
            timestamp: Utc::now(),
            status: ToolUsageStatus::Success,
            result_summary: Some(summary),
            error: None,
        }
    }

    pub fn failure(tool_name: &str, parameters: Value, error: String) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            parameters,
            timestamp: Utc::now(),
            status: ToolUsageStatus::Error,
            result_summary: None,
            error: Some(error),
        }
    }
}
