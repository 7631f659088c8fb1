use serde::{Deserialize, Serialize};

use crate::types::{Message, ToolUsageEntry};

/// POST /api/chat request: the conversation so far, oldest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Identity of the acting user, used to build the system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
}

/// Session context supplied by the ERP front end.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// POST /api/chat response.
///
/// Orchestration failures are returned as data, never as HTTP errors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Error {
        error: String,
        #[serde(default)]
        tool_usage: Vec<ToolUsageEntry>,
    },
    Answer {
        #[serde(flatten)]
        message: Message,
        #[serde(default)]
        tool_usage: Vec<ToolUsageEntry>,
    },
}

impl ChatResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            tool_usage: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn tool_usage(&self) -> &[ToolUsageEntry] {
        match self {
            Self::Error { tool_usage, .. } | Self::Answer { tool_usage, .. } => tool_usage,
        }
    }
}

/// POST /api/test-key request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestKeyRequest {
    pub api_key: String,
}

/// POST /api/test-key response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestKeyResponse {
    pub valid: bool,
}

/// GET /api/test-connection response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

/// GET /api/chat-button response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatButtonVisibility {
    pub show_button: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_answer_flattens_message() {
        let response = ChatResponse::Answer {
            message: Message::assistant("Acme has 3 open invoices."),
            tool_usage: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "Acme has 3 open invoices.");
        assert_eq!(json["tool_usage"], serde_json::json!([]));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_shape() {
        let json = serde_json::to_value(ChatResponse::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "boom", "tool_usage": []}));
    }

    #[test]
    fn test_request_context_is_optional() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hi"}]}"#).unwrap();
        assert!(request.context.is_none());
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[test]
    fn test_response_deserializes_both_variants() {
        let error: ChatResponse =
            serde_json::from_str(r#"{"error": "nope", "tool_usage": []}"#).unwrap();
        assert!(error.is_error());

        let answer: ChatResponse =
            serde_json::from_str(r#"{"role": "assistant", "content": "ok", "tool_usage": []}"#)
                .unwrap();
        assert!(!answer.is_error());
    }
}
