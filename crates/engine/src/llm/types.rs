use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use erpchat_common::types::{Message, Role, ToolCallRequest};

/// A tool definition sent to the LLM.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the accepted named parameters.
    pub parameters: Value,
}

/// How the model may use the advertised tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call zero, one or several tools.
    Auto,
}

/// Parsed response from an LLM API call.
#[derive(Clone, Debug)]
pub struct LlmResponse {
    /// The assistant message, possibly carrying tool call requests.
    pub message: Message,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

/// Why the LLM stopped generating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
}

/// Token usage from a single API call.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
