use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use erpchat_common::ErpChatError;
use erpchat_engine::config::{self, EngineConfig};
use erpchat_engine::llm::{LlmCaller, LlmClient};
use erpchat_engine::orchestrator::ChatOrchestrator;
use erpchat_engine::prompt::SystemPrompt;
use erpchat_engine::routes::{self, AppState};
use erpchat_engine::store::ErpStore;
use erpchat_engine::tools::{register_erp_tools, ErpToolContext, ToolRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("erpchat engine starting");

    if let Err(e) = run().await {
        tracing::error!(
            error = %e,
            hard_dependency = e.is_hard_dependency(),
            "erpchat engine failed, refusing to start"
        );
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ErpChatError> {
    let config_dir = std::env::var("ERPCHAT_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let engine_config = config::load_config(&config_dir)?;

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ErpChatError::Internal(format!("Failed to install metrics recorder: {}", e)))?;

    let store = connect_store(&engine_config).await?;

    // Missing key is not fatal: chat requests report it instead.
    let llm_client = LlmClient::new(engine_config.system.llm.clone()).map(Arc::new);
    if let Some(ref client) = llm_client {
        tracing::info!(model = %client.model(), "LLM client ready");
    }

    let mut registry = ToolRegistry::new();
    register_erp_tools(
        &mut registry,
        ErpToolContext {
            store: store.clone(),
            limits: engine_config.system.tool_results.clone(),
            default_company: engine_config.system.erp.default_company.clone(),
        },
    );
    tracing::info!(tools = registry.len(), "Tool registry built");

    let caller = llm_client
        .clone()
        .map(|client| client as Arc<dyn LlmCaller>);
    let orchestrator = ChatOrchestrator::new(
        caller,
        Arc::new(registry),
        engine_config.system.llm.max_tokens as usize,
    );

    let prompt = SystemPrompt::new(engine_config.prompts.get("system").map(String::as_str));
    let port = engine_config.system.server.port;

    let state = Arc::new(AppState {
        store,
        llm: llm_client,
        llm_config: engine_config.system.llm.clone(),
        orchestrator,
        prompt,
        metrics_handle: Some(metrics_handle),
    });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port = port, "erpchat engine listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn connect_store(config: &EngineConfig) -> Result<ErpStore, ErpChatError> {
    let url = config.database_url().ok_or_else(|| {
        ErpChatError::Config("DATABASE_URL or [database] url must be set".into())
    })?;
    let store = ErpStore::connect(&url, config.system.database.max_connections).await?;
    Ok(store)
}
