use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use http::StatusCode;

use common::sync::SyncError;

use crate::ServiceState;

pub mod get;
pub mod list;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/list", post(list::handler))
        .route("/get", post(get::handler))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum TimelineApiError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("no timeline entry {0}")]
    NotFound(String),
}

impl IntoResponse for TimelineApiError {
    fn into_response(self) -> Response {
        match self {
            e @ TimelineApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            TimelineApiError::Sync(e) => {
                tracing::error!("timeline API error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}
