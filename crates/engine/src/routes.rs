use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use erpchat_common::api::chat::{
    ChatButtonVisibility, ChatRequest, ChatResponse, ConnectionStatus, TestKeyRequest,
    TestKeyResponse,
};
use erpchat_common::config::LlmConfig;

use crate::llm::{self, LlmClient, FALLBACK_CHAT_MODELS};
use crate::orchestrator::ChatOrchestrator;
use crate::prompt::SystemPrompt;
use crate::store::ErpStore;

/// Shared application state accessible from axum handlers.
pub struct AppState {
    pub store: ErpStore,
    /// `None` when no API key is configured.
    pub llm: Option<Arc<LlmClient>>,
    /// Settings used to probe keys submitted through the API.
    pub llm_config: LlmConfig,
    pub orchestrator: ChatOrchestrator,
    pub prompt: SystemPrompt,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/test-key", post(test_key_handler))
        .route("/api/models", get(models_handler))
        .route("/api/test-connection", get(test_connection_handler))
        .route("/api/chat-button", get(chat_button_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Answer a conversation. Orchestration failures are in the body; the status is always 200.
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let prompt = state
        .prompt
        .render(chrono::Utc::now(), request.context.as_ref());
    Json(state.orchestrator.ask(request.messages, &prompt).await)
}

async fn test_key_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestKeyRequest>,
) -> Json<TestKeyResponse> {
    let valid = LlmClient::test_api_key(&state.llm_config, &request.api_key).await;
    Json(TestKeyResponse { valid })
}

async fn models_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let models = match &state.llm {
        Some(client) => client.available_chat_models().await,
        None => FALLBACK_CHAT_MODELS.iter().map(|m| m.to_string()).collect(),
    };
    Json(models)
}

async fn test_connection_handler(State(state): State<Arc<AppState>>) -> Json<ConnectionStatus> {
    Json(llm::connection_status(state.llm.as_deref()).await)
}

async fn chat_button_handler() -> Json<ChatButtonVisibility> {
    Json(ChatButtonVisibility { show_button: true })
}

/// Health check endpoint. The service is healthy when the ERP database answers.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let postgres_ok = state.store.health_check().await.is_ok();

    let status = if postgres_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "status": if postgres_ok { "healthy" } else { "unhealthy" },
        "services": {
            "postgres": if postgres_ok { "healthy" } else { "unhealthy" },
            "llm": if state.llm.is_some() { "configured" } else { "missing_api_key" },
        }
    });

    (status, Json(body))
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}
