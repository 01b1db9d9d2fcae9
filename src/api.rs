use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::orchestrator::{AnalyzeOptions, PipelineOrchestrator};
use crate::types::AnalysisResult;
use crate::TARGET_ANALYSIS;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub question: String,
    #[serde(default)]
    pub options: AnalyzeOptions,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(orchestrator: Arc<PipelineOrchestrator>) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .with_state(orchestrator)
}

pub async fn serve(orchestrator: Arc<PipelineOrchestrator>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("server running on http://{}", addr);

    axum::serve(listener, router(orchestrator).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn analyze(
    State(orchestrator): State<Arc<PipelineOrchestrator>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, (StatusCode, Json<ErrorBody>)> {
    match orchestrator.analyze(&request.question, &request.options).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => Err(error_response(err)),
    }
}

/// Validation failures carry their reason back to the caller; everything
/// else is logged server-side and answered with a generic body.
fn error_response(err: PipelineError) -> (StatusCode, Json<ErrorBody>) {
    match err {
        PipelineError::Validation { reason } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: reason }),
        ),
        other => {
            error!(target: TARGET_ANALYSIS, "analysis failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "analysis failed".to_string(),
                }),
            )
        }
    }
}
