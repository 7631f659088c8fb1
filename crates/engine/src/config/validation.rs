use super::loader::{ConfigError, EngineConfig};

/// Providers the model client can talk to.
const KNOWN_PROVIDERS: &[&str] = &["openai"];

/// Validate the complete engine configuration.
///
/// Collects every problem before failing so one restart fixes them all.
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_llm(config, &mut errors);
    validate_tool_results(config, &mut errors);
    validate_database(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

fn validate_llm(config: &EngineConfig, errors: &mut Vec<String>) {
    let llm = &config.system.llm;

    if !KNOWN_PROVIDERS.contains(&llm.provider.as_str()) {
        errors.push(format!(
            "llm.provider must be one of {:?}, got {:?}",
            KNOWN_PROVIDERS, llm.provider
        ));
    }
    if llm.model.is_empty() {
        errors.push("llm.model must not be empty".into());
    }
    if llm.max_tokens == 0 {
        errors.push("llm.max_tokens must be > 0".into());
    }
    if llm.max_response_tokens == Some(0) {
        errors.push("llm.max_response_tokens must be > 0 when set".into());
    }
    if let Some(temp) = llm.temperature {
        if !(0.0..=2.0).contains(&temp) {
            errors.push("llm.temperature must be between 0.0 and 2.0".into());
        }
    }
    if llm.base_url.is_empty() {
        errors.push("llm.base_url must not be empty".into());
    }
}

fn validate_tool_results(config: &EngineConfig, errors: &mut Vec<String>) {
    if config.system.tool_results.max_records == 0 {
        errors.push("tool_results.max_records must be > 0".into());
    }
}

fn validate_database(config: &EngineConfig, errors: &mut Vec<String>) {
    if config.system.database.max_connections == 0 {
        errors.push("database.max_connections must be > 0".into());
    }
}
