use axum::extract::Query;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use extractor_service_cli::ai;

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub key: Option<String>,
}

pub async fn list_models(Query(query): Query<ModelsQuery>) -> (StatusCode, Json<Value>) {
    let key = query
        .key
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty());
    let Some(key) = key else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "API key is required" })));
    };

    match ai::list_models(&key).await {
        Ok(models) => (StatusCode::OK, Json(json!({ "models": models }))),
        Err(e) => {
            tracing::error!("model listing failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch models", "details": e.to_string() })),
            )
        }
    }
}
