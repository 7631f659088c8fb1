use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
    FinishReason, LlmResponse, Message, Role, TokenUsage, ToolCallRequest, ToolChoice,
    ToolDefinition,
};
use super::LlmError;

// ---------------------------------------------------------------------------
// Request wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize)]
struct ChatTool {
    r#type: &'static str,
    function: ChatFunction,
}

#[derive(Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    r#type: String,
    function: ChatToolCallFunction,
}

#[derive(Serialize, Deserialize)]
struct ChatToolCallFunction {
    name: String,
    arguments: String,
}

// ---------------------------------------------------------------------------
// Response wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_wire_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|msg| {
            let tool_calls = if msg.tool_calls.is_empty() {
                None
            } else {
                Some(
                    msg.tool_calls
                        .iter()
                        .map(|tc| ChatToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ChatToolCallFunction {
                                name: tc.function_name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            };

            ChatMessage {
                role: msg.role.as_str(),
                content: msg.content.clone(),
                tool_calls,
                tool_call_id: msg.tool_call_id.clone(),
                name: msg.name.clone(),
            }
        })
        .collect()
}

fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|t| ChatTool {
            r#type: "function",
            function: ChatFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

fn from_wire_response(resp: ChatResponse) -> Result<LlmResponse, LlmError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Parse("Empty choices array".into()))?;

    // Arguments stay as raw text; the dispatcher owns decoding them.
    let tool_calls: Vec<ToolCallRequest> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest {
            id: tc.id,
            function_name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    };

    let usage = resp
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        message: Message {
            role: Role::Assistant,
            content: choice.message.content,
            tool_calls,
            tool_call_id: None,
            name: None,
        },
        finish_reason,
        usage,
    })
}

/// Map a non-success HTTP response to an LlmError.
async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return LlmError::Auth(format!("{}: {}", status, body));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return LlmError::RateLimited { retry_after };
    }

    let body = response.text().await.unwrap_or_default();
    let msg = match serde_json::from_str::<OpenAiError>(&body) {
        Ok(e) => {
            if e.error.code.as_deref() == Some("context_length_exceeded")
                || e.error.message.contains("context_length_exceeded")
            {
                return LlmError::ContextWindowExceeded(e.error.message);
            }
            e.error.message
        }
        Err(_) => body,
    };
    LlmError::Api(format!("{}: {}", status, msg))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Send a chat completion request to an OpenAI-compatible API.
#[allow(clippy::too_many_arguments)]
pub async fn send_chat_completion(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    messages: &[Message],
    tools: &[ToolDefinition],
    tool_choice: Option<ToolChoice>,
) -> Result<LlmResponse, LlmError> {
    let start = std::time::Instant::now();

    let wire_tools = to_wire_tools(tools);
    // tool_choice is only meaningful alongside a tool list.
    let tool_choice = if wire_tools.is_empty() {
        None
    } else {
        tool_choice
    };

    let request = ChatRequest {
        model,
        messages: to_wire_messages(messages),
        tools: wire_tools,
        tool_choice,
        max_tokens,
        temperature,
    };

    let response = http
        .post(format!("{}/chat/completions", base_url))
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    let latency = start.elapsed().as_secs_f64();
    metrics::histogram!("llm.api.latency", "provider" => "openai", "model" => model.to_string())
        .record(latency);

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse OpenAI response: {}", e)))?;

    let llm_response = from_wire_response(body)?;

    metrics::counter!("llm.api.input_tokens", "provider" => "openai")
        .increment(llm_response.usage.input_tokens);
    metrics::counter!("llm.api.output_tokens", "provider" => "openai")
        .increment(llm_response.usage.output_tokens);

    tracing::debug!(
        latency_s = latency,
        tool_calls = llm_response.message.tool_calls.len(),
        "OpenAI response received"
    );

    Ok(llm_response)
}

/// List model ids available to `api_key`.
pub async fn list_models(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<String>, LlmError> {
    let response = http
        .get(format!("{}/models", base_url))
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| LlmError::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let body: ModelList = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse model list: {}", e)))?;

    Ok(body.data.into_iter().map(|m| m.id).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
