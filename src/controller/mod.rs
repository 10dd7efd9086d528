use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::model::app_state::AppState;

pub use download_controller::*;
pub use file_controller::*;

mod download_controller;
mod file_controller;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/download", post(submit_download))
        .route("/files", get(list_files))
        .route("/play/:filename", get(play_file))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
