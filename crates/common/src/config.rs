use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from system.toml.
///
/// Every section has defaults so a missing or partial file still yields a
/// usable configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub llm: LlmConfig,
    pub tool_results: ToolResultLimits,
    pub database: DatabaseConfig,
    pub erp: ErpConfig,
    pub server: ServerConfig,
}

/// Model provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name. Only "openai" is supported.
    pub provider: String,
    /// Model identifier sent with every chat completion.
    pub model: String,
    /// Conversation token ceiling enforced by trimming (estimated tokens).
    pub max_tokens: u32,
    /// Max tokens in the model's response; omitted from requests when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_tokens: Option<u32>,
    /// Temperature (0.0–2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Inline API key. The environment variable takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_response_tokens: None,
            temperature: None,
            base_url: DEFAULT_OPENAI_BASE_URL.into(),
            api_key_env: "OPENAI_API_KEY".into(),
            api_key: None,
        }
    }
}

/// Size limits applied to tool results before they enter the conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolResultLimits {
    /// Max records returned by a list tool.
    pub max_records: u32,
}

impl Default for ToolResultLimits {
    fn default() -> Self {
        Self { max_records: 100 }
    }
}

/// ERP database connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL. `DATABASE_URL` takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// ERP-specific defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErpConfig {
    /// Company used by reports when neither the model nor the caller names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_company: Option<String>,
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: SystemConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.tool_results.max_records, 100);
        assert_eq!(config.server.port, 8080);
        assert!(config.erp.default_company.is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o"
            temperature = 0.2

            [erp]
            default_company = "Acme Corp"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.temperature, Some(0.2));
        assert_eq!(config.llm.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.llm.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.erp.default_company.as_deref(), Some("Acme Corp"));
    }
}
