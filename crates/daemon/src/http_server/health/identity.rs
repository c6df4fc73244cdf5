use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::ServiceState;

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    /// Canonical base64 signing key
    pub public_key: String,
    /// Address advertised to other nodes
    pub address: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let node = state.node();
    (
        StatusCode::OK,
        Json(IdentityResponse {
            public_key: node.public_key().to_base64(),
            address: node.address().to_string(),
        }),
    )
        .into_response()
}
