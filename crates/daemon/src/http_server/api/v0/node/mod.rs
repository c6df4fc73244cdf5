use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use http::StatusCode;

use common::address::Address;
use common::directory::DirectoryError;

use crate::ServiceState;

pub mod list;
pub mod refresh;
pub mod resolve;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/resolve", post(resolve::handler))
        .route("/refresh", post(refresh::handler))
        .route("/list", post(list::handler))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum NodeApiError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("no node answered at {0}")]
    Unreachable(Address),
}

impl IntoResponse for NodeApiError {
    fn into_response(self) -> Response {
        match self {
            e @ NodeApiError::Unreachable(_) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            NodeApiError::Directory(e) => {
                tracing::error!("directory API error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}
