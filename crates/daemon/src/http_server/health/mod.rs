//! `/_status` routes shared by both servers

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use common::prelude::build_info;

use crate::ServiceState;

mod identity;
mod readiness;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/identity", get(identity::handler))
        .route("/livez", get(livez))
        .route("/readyz", get(readiness::handler))
        .route("/version", get(version))
        .with_state(state)
}

/// The process is up and serving
async fn livez() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn version() -> impl IntoResponse {
    Json(build_info())
}
