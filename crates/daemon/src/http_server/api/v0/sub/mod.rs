use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use http::StatusCode;

use common::relay::RelayError;
use common::sync::SyncError;

use crate::ServiceState;

pub mod add;
pub mod list;
pub mod remove;
pub mod subscribers;
pub mod sync;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/add", post(add::handler))
        .route("/list", post(list::handler))
        .route("/remove", post(remove::handler))
        .route("/subscribers", post(subscribers::handler))
        .route("/sync", post(sync::handler))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum SubApiError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("no subscription {0}")]
    NotFound(String),
}

impl IntoResponse for SubApiError {
    fn into_response(self) -> Response {
        match self {
            SubApiError::Sync(e @ SyncError::UnknownPeer(_)) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            SubApiError::Sync(e @ SyncError::SelfSubscription) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            SubApiError::Sync(e @ SyncError::Pull(_)) => {
                (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
            }
            e @ SubApiError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
            e => {
                tracing::error!("subscription API error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}
