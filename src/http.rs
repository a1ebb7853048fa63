//! HTTP front end
//!
//! `POST /fact-check` runs the pipeline for `{claim, source?}`; `GET /health`
//! answers `{"status":"healthy"}`. CORS is open to any origin.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::models::{KeyFinding, Verdict};
use crate::pipeline::{PipelineState, StageOrchestrator};

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub orchestrator: Arc<StageOrchestrator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    High,
    Medium,
    Low,
}

impl Reliability {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Reliability::High
        } else if score > 0.4 {
            Reliability::Medium
        } else {
            Reliability::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceView {
    pub url: String,
    pub trust_score: f64,
    pub reliability: Reliability,
}

/// Caller-facing rendering of a finished pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResponse {
    pub verdict: Verdict,
    pub confidence: f64,
    pub summary: String,
    pub key_findings: Vec<KeyFinding>,
    pub sources: Vec<SourceView>,
}

impl FactCheckResponse {
    pub fn from_state(state: &PipelineState) -> Option<Self> {
        let summary = state.summary()?;
        Some(Self {
            verdict: summary.verdict,
            confidence: summary.confidence,
            summary: summary.evidence_summary.clone(),
            key_findings: summary.key_findings.clone(),
            sources: summary
                .citations
                .iter()
                .map(|c| SourceView {
                    url: c.source.clone(),
                    trust_score: c.trust_score,
                    reliability: Reliability::from_score(c.trust_score),
                })
                .collect(),
        })
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Replay the run's message log into the service log.
fn log_messages(state: &PipelineState) {
    for message in state.messages().entries() {
        let agent = message.agent.to_uppercase();
        if message.error {
            error!("[{}] {} at {}", agent, message.content, message.timestamp);
        } else {
            info!("[{}] {} at {}", agent, message.content, message.timestamp);
        }
    }
}

pub async fn fact_check_handler(
    State(state): State<HttpState>,
    body: Option<Json<Value>>,
) -> Response {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let claim = match body.get("claim").and_then(Value::as_str) {
        Some(c) if !c.trim().is_empty() => c,
        _ => return error_response(StatusCode::BAD_REQUEST, "Claim is required"),
    };
    let source = body.get("source").and_then(Value::as_str);

    info!("Processing fact check for claim: {}", claim);
    if let Some(source) = source {
        info!("Using provided source: {}", source);
    }

    let run = match state.orchestrator.run(claim, source).await {
        Ok(run) => run,
        Err(e) if e.is_input() => {
            return (StatusCode::BAD_REQUEST, Json(e.to_json())).into_response();
        }
        Err(e) => {
            error!("Error processing fact check: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(e.to_json())).into_response();
        }
    };
    log_messages(&run);

    match FactCheckResponse::from_state(&run) {
        Some(response) => {
            info!(
                "Returning {} ({:.2}) with {} key findings and {} sources",
                response.verdict,
                response.confidence,
                response.key_findings.len(),
                response.sources.len()
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        None => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "pipeline finished without a summary",
        ),
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub fn router(orchestrator: Arc<StageOrchestrator>) -> Router {
    Router::new()
        .route("/fact-check", post(fact_check_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(HttpState { orchestrator })
}

/// Bind and serve until the shutdown future resolves.
pub async fn start_http_server(
    config: &Config,
    orchestrator: Arc<StageOrchestrator>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(orchestrator);
    let listener = tokio::net::TcpListener::bind(config.runtime.http_bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    info!("Starting HTTP server on {}", config.runtime.http_bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
