use std::collections::HashMap;
use std::path::{Path, PathBuf};

use erpchat_common::config::SystemConfig;

use super::validation;

/// Complete engine configuration loaded from the config directory.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Parsed system.toml, with environment overrides applied.
    pub system: SystemConfig,
    /// Prompt templates keyed by filename stem (e.g. "system").
    pub prompts: HashMap<String, String>,
    pub config_dir: PathBuf,
}

impl EngineConfig {
    /// The database URL: `DATABASE_URL` first, then `[database] url`.
    pub fn database_url(&self) -> Option<String> {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| self.system.database.url.clone())
    }
}

/// Load all configuration from the given config directory.
///
/// A missing system.toml yields defaults. Anything present but broken fails
/// loudly; the engine refuses to start on validation failure.
pub fn load_config(config_dir: &Path) -> Result<EngineConfig, ConfigError> {
    tracing::info!(config_dir = %config_dir.display(), "Loading configuration");

    let mut system = load_system_config(&config_dir.join("system.toml"))?;
    apply_env_overrides(&mut system);

    let prompts = load_prompts(&config_dir.join("prompts"))?;

    let config = EngineConfig {
        system,
        prompts,
        config_dir: config_dir.to_path_buf(),
    };

    validation::validate(&config)?;

    tracing::info!(
        model = %config.system.llm.model,
        max_tokens = config.system.llm.max_tokens,
        prompts = config.prompts.len(),
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "system.toml not found, using defaults");
        return Ok(SystemConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn apply_env_overrides(system: &mut SystemConfig) {
    if let Some(port) = std::env::var("ERPCHAT_PORT").ok().and_then(|p| p.parse().ok()) {
        system.server.port = port;
    }
}

fn load_prompts(prompts_dir: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut prompts = HashMap::new();

    if !prompts_dir.exists() {
        tracing::debug!(
            path = %prompts_dir.display(),
            "Prompts directory does not exist, using built-in prompt"
        );
        return Ok(prompts);
    }

    let entries = std::fs::read_dir(prompts_dir).map_err(|e| ConfigError::FileRead {
        path: prompts_dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::FileRead {
            path: prompts_dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        if !path
            .extension()
            .is_some_and(|ext| ext == "md" || ext == "txt")
        {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(prompt = %name, "Loaded prompt template");
        prompts.insert(name, content);
    }

    Ok(prompts)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for erpchat_common::ErpChatError {
    fn from(e: ConfigError) -> Self {
        erpchat_common::ErpChatError::Config(e.to_string())
    }
}
