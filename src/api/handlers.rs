use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::context::Analysis;

pub const ROOT_MESSAGE: &str = "AI Service Marketplace API is running.";

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Seconds since startup
    pub uptime: u64,
    pub corpus_entries: usize,
    pub categories: usize,
    /// Live directory backend name
    pub directory: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub problem: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedResponse {
    pub message: String,
    pub seeded: bool,
    pub count: usize,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ctx = &state.context;
    let index = ctx.matcher().index();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: ctx.uptime().as_secs(),
        corpus_entries: index.len(),
        categories: index.categories().len(),
        directory: ctx.workers().directory().name().to_string(),
    })
}

pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<Analysis>> {
    let Json(request) = payload?;
    let problem = request.problem.trim();
    if problem.is_empty() {
        return Err(ApiError::BadRequest(
            "problem must be a non-empty string".to_string(),
        ));
    }

    let analysis = state.context.analyze(problem).await;
    debug!(
        "Analyzed problem into {} ({} workers)",
        analysis.detected_category,
        analysis.available_workers.len()
    );
    Ok(Json(analysis))
}

pub async fn seed_workers(State(state): State<AppState>) -> ApiResult<Json<SeedResponse>> {
    let report = state.context.seed().await?;
    let message = if report.seeded {
        format!("Successfully seeded {} workers", report.count)
    } else {
        "Workers collection already has data".to_string()
    };
    info!("{}", message);

    Ok(Json(SeedResponse {
        message,
        seeded: report.seeded,
        count: report.count,
    }))
}

pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    if !state.metrics.is_enabled() {
        return Err(ApiError::NotFound);
    }
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
