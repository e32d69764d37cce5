// src/server.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::core::catalog::AVAILABLE_TOOLS;
use crate::core::executor;
use crate::core::models::{OutcomeStatus, ScanOutcome};

/// Body of a `POST /api/scan` request.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "toolId")]
    pub tool_id: String,
    pub target: String,
}

/// Runs the execution service until the process is stopped.
///
/// Every inbound scan request spawns its own subprocess with its own timeout
/// and output cap; concurrent requests are fully independent and no tool
/// failure is fatal to the service.
pub async fn serve(config: Config) -> color_eyre::Result<()> {
    let cors = CorsLayer::permissive();

    let app = Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/api/scan", post(scan))
        .with_state(config.clone())
        .layer(cors);

    let tool_ids: Vec<String> = AVAILABLE_TOOLS.iter().map(|t| t.id.to_string()).collect();
    info!(address = %config.bind, "execution service listening");
    info!(tools = %tool_ids.join(", "), "available tools (ensure they are installed and in PATH)");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn banner() -> Json<Value> {
    Json(json!({
        "system": "autorecon",
        "status": "operational",
        "mode": "local execution service",
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// Validation failures (bad target, unknown tool) are rejected with 400 before
// any subprocess exists; subprocess-level failures come back as 200 with
// status "failed". The controller relies on that distinction.
async fn scan(
    State(config): State<Config>,
    Json(payload): Json<ScanRequest>,
) -> (StatusCode, Json<ScanOutcome>) {
    handle_scan(&config, &payload).await
}

async fn handle_scan(config: &Config, payload: &ScanRequest) -> (StatusCode, Json<ScanOutcome>) {
    match executor::execute_tool(&payload.tool_id, &payload.target, config).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ScanOutcome {
                status: OutcomeStatus::Error,
                output: e.to_string(),
            }),
        ),
    }
}
