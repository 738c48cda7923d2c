use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::RelayError;
use crate::gemini::GeminiClient;
use crate::n8n::N8nClient;
use crate::preview::sample_workflow;
use crate::relay::Relay;
use crate::validator::Validator;

#[derive(Clone)]
pub struct AppState {
    relay: Relay,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub now: String,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }

    pub fn from_config(config: &Config) -> Self {
        let validator = Validator::new().check_targets(config.strict_connections);
        Self::new(Relay::new(
            Arc::new(GeminiClient::new(config)),
            Arc::new(N8nClient::new(config)),
            validator,
        ))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/preview", get(handle_preview))
        .route("/generate", post(handle_generate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    log::info!("GEMINI key present? {}", !config.gemini_api_key.is_empty());
    log::info!("N8N_BASE_URL present? {}", config.n8n_base_url.is_some());
    log::info!("N8N_API_KEY present? {}", config.n8n_api_key.is_some());

    let app = router(AppState::from_config(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("🚀 Generator (Gemini) listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_index() -> &'static str {
    "n8n Workflow Generator (Gemini) running. Use POST /generate"
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        now: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

async fn handle_preview() -> Json<Value> {
    Json(sample_workflow())
}

async fn handle_generate(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let prompt = match extract_prompt(&body) {
        Some(p) => p,
        None => {
            log::warn!("[{}] Rejected request without prompt", request_id);
            return RelayError::MissingPrompt.into_response();
        }
    };
    log::info!("[{}] Received generate request ({} chars)", request_id, prompt.chars().count());

    match state.relay.generate(&request_id, &prompt).await {
        Ok(created) => Json(created).into_response(),
        Err(e) => {
            log::error!("[{}] ERROR /generate: {}", request_id, e);
            e.into_response()
        }
    }
}

/// The body must be a JSON object with a non-empty string `prompt`.
fn extract_prompt(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    payload
        .get("prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}
