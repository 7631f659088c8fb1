mod openai;
pub mod types;

use std::future::Future;
use std::pin::Pin;

use erpchat_common::api::chat::ConnectionStatus;
use erpchat_common::config::LlmConfig;

pub use types::{
    FinishReason, LlmResponse, Message, Role, TokenUsage, ToolCallRequest, ToolChoice,
    ToolDefinition,
};

/// Models offered when the provider's model list cannot be fetched.
pub const FALLBACK_CHAT_MODELS: [&str; 6] = [
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-4o-mini",
];

/// LLM API client. Every call is a single attempt; failures are never retried.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

/// Errors from LLM API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM HTTP error: {0}")]
    Http(String),

    #[error("LLM auth error: {0}")]
    Auth(String),

    #[error("LLM rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("LLM context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM response parse error: {0}")]
    Parse(String),
}

impl From<LlmError> for erpchat_common::ErpChatError {
    fn from(e: LlmError) -> Self {
        erpchat_common::ErpChatError::LlmApi(e.to_string())
    }
}

impl LlmClient {
    /// Create a new LLM client.
    /// The key comes from the configured env var, then the inline `api_key`.
    /// Returns None if neither is set.
    pub fn new(config: LlmConfig) -> Option<Self> {
        if config.provider != "openai" {
            tracing::warn!(provider = %config.provider, "Unknown LLM provider");
            return None;
        }

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| config.api_key.clone().filter(|k| !k.is_empty()));

        match api_key {
            Some(key) => Some(Self::with_api_key(config, key)),
            None => {
                tracing::warn!(
                    env_var = %config.api_key_env,
                    "API key not set, chat requests will be refused"
                );
                None
            }
        }
    }

    /// Create a client with an explicit key, bypassing configuration lookup.
    pub fn with_api_key(config: LlmConfig, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one chat completion request.
    pub async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        tool_choice: Option<ToolChoice>,
    ) -> Result<LlmResponse, LlmError> {
        let result = openai::send_chat_completion(
            &self.http,
            &self.config.base_url,
            &self.api_key,
            &self.config.model,
            self.config.max_response_tokens,
            self.config.temperature,
            messages,
            tools,
            tool_choice,
        )
        .await;

        if let Err(ref e) = result {
            metrics::counter!("llm.api.errors", "provider" => self.config.provider.clone())
                .increment(1);
            tracing::warn!(error = %e, model = %self.config.model, "LLM API call failed");
        }

        result
    }

    /// List the model ids visible to this key.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        openai::list_models(&self.http, &self.config.base_url, &self.api_key).await
    }

    /// Chat-capable model ids, sorted. Falls back to a fixed list on error.
    pub async fn available_chat_models(&self) -> Vec<String> {
        match self.list_models().await {
            Ok(models) => {
                let mut chat_models: Vec<String> = models
                    .into_iter()
                    .filter(|id| ["gpt-3.5", "gpt-4"].iter().any(|p| id.contains(p)))
                    .collect();
                chat_models.sort();
                chat_models
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch available models, using defaults");
                FALLBACK_CHAT_MODELS.iter().map(|m| m.to_string()).collect()
            }
        }
    }

    /// Whether `api_key` can list models against the configured endpoint.
    pub async fn test_api_key(config: &LlmConfig, api_key: &str) -> bool {
        let client = Self::with_api_key(config.clone(), api_key.to_string());
        match client.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "API key test failed");
                false
            }
        }
    }
}

/// Probe the provider with the configured client.
pub async fn connection_status(client: Option<&LlmClient>) -> ConnectionStatus {
    let Some(client) = client else {
        return ConnectionStatus {
            success: false,
            message: "OpenAI API key is not set. Please enter an API key first.".into(),
        };
    };

    match client.list_models().await {
        Ok(models) if !models.is_empty() => ConnectionStatus {
            success: true,
            message: "Connection successful! OpenAI API is working correctly.".into(),
        },
        Ok(_) => ConnectionStatus {
            success: false,
            message: "Connection established but no models available.".into(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "OpenAI connection test failed");
            ConnectionStatus {
                success: false,
                message: format!("Connection failed: {}", e),
            }
        }
    }
}

/// Object-safe trait for testability (dyn dispatch).
/// Tests provide a mock caller; production uses LlmClient.
pub trait LlmCaller: Send + Sync {
    fn chat<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
        tool_choice: Option<ToolChoice>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>>;
}

impl LlmCaller for LlmClient {
    fn chat<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
        tool_choice: Option<ToolChoice>,
    ) -> Pin<Box<dyn Future<Output = Result<LlmResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.chat(messages, tools, tool_choice))
    }
}
