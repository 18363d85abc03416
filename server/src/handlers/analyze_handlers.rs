use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use extractor_service_cli::ai::AiAnalyzer;
use extractor_service_cli::assemble::ContentPipeline;
use extractor_service_cli::fetch::FetchError;
use extractor_service_cli::AnalyzeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePayload {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

pub async fn analyze_url(Json(payload): Json<AnalyzePayload>) -> (StatusCode, Json<Value>) {
    let Some(url) = payload.url.filter(|u| !u.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "URL is required" })));
    };

    let api_key = payload.api_key.or_else(|| std::env::var("GEMINI_API_KEY").ok());
    let ai = api_key.map(|key| AiAnalyzer::new(key, payload.model));

    let pipeline = match ContentPipeline::new(ai) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("pipeline setup failed: {e}");
            return internal_error(&e.to_string());
        }
    };

    match pipeline.analyze(&url).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => internal_error(&e.to_string()),
        },
        Err(e) => {
            tracing::warn!("analysis of {url} failed: {e}");
            error_response(e)
        }
    }
}

/// Only input and upstream-fetch errors reach the caller; the upstream
/// status is mirrored so the frontend can tell a dead link from our fault.
fn error_response(err: AnalyzeError) -> (StatusCode, Json<Value>) {
    match err {
        AnalyzeError::InvalidUrl(url) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid URL", "details": url })),
        ),
        AnalyzeError::Fetch(FetchError::Status { status, status_text }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(json!({
                "error": format!("Failed to fetch URL: {status_text}"),
                "details": format!("Upstream returned status {status}"),
            })),
        ),
        AnalyzeError::Fetch(FetchError::Transport(e)) => internal_error(&e.to_string()),
    }
}

fn internal_error(details: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to analyze URL", "details": details })),
    )
}
