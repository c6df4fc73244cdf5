use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use http::StatusCode;

use common::feed::FeedError;

use crate::ServiceState;

pub mod list;
pub mod publish;
pub mod remove;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/publish", post(publish::handler))
        .route("/list", post(list::handler))
        .route("/remove", post(remove::handler))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum FeedApiError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("no feed item {0}")]
    NotFound(String),
}

impl IntoResponse for FeedApiError {
    fn into_response(self) -> Response {
        match self {
            FeedApiError::Feed(FeedError::InvalidItem(msg)) => {
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            FeedApiError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("no feed item {}", id)).into_response()
            }
            FeedApiError::Feed(e) => {
                tracing::error!("feed API error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}
