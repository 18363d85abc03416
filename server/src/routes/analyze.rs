use axum::routing::{get, post};
use axum::Router;

use crate::handlers::analyze_handlers::analyze_url;
use crate::handlers::model_handlers::list_models;

pub fn analyze_routes() -> Router {
    Router::new()
        .route("/analyze", post(analyze_url))
        .route("/models", get(list_models))
}
