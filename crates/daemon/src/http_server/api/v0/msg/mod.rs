use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use http::StatusCode;

use common::relay::RelayError;

use crate::ServiceState;

pub mod inbox;
pub mod outbox;
pub mod remove;
pub mod send;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/send", post(send::handler))
        .route("/inbox", post(inbox::handler))
        .route("/outbox", post(outbox::handler))
        .route("/remove", post(remove::handler))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum MsgApiError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("no message {0}")]
    NotFound(String),
}

impl IntoResponse for MsgApiError {
    fn into_response(self) -> Response {
        match self {
            MsgApiError::Relay(e @ RelayError::UnknownPeer(_)) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            MsgApiError::Relay(e @ RelayError::InvalidMessage(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            e @ MsgApiError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
            e => {
                tracing::error!("message API error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}
