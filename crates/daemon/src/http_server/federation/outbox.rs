use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{HeaderMap, StatusCode};

use common::relay::RelayError;

use super::authorization;
use crate::ServiceState;

/// `GET /api/outbox`: only ever answered encrypted
pub async fn handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
) -> Result<Response, OutboxError> {
    let envelope = state
        .node()
        .relay()
        .serve_outbox(authorization(&headers))
        .await?;
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct OutboxError(#[from] RelayError);

impl IntoResponse for OutboxError {
    fn into_response(self) -> Response {
        match self.0 {
            RelayError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "credential required").into_response()
            }
            e => {
                tracing::error!("failed to serve outbox: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::AUTHORIZATION;
    use http::Request;

    use common::crypto::{ClientHandshake, EncryptedEnvelope, SecretKey};
    use common::protocol::OutboxPage;

    use super::*;
    use crate::http_server::{federation_router, test_utils};

    #[tokio::test]
    async fn test_anonymous_outbox_is_unauthorized() {
        let router = federation_router(test_utils::state("outbox-anon").await);
        let request = Request::get("/api/outbox").body(Body::empty()).unwrap();
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verified_outbox_opens_for_requester() {
        let state = test_utils::state("outbox-enc").await;
        let owner = *state.node().public_key();
        let router = federation_router(state);

        let reader = SecretKey::generate();
        let handshake = ClientHandshake::new(&reader).unwrap();
        let request = Request::get("/api/outbox")
            .header(AUTHORIZATION, handshake.authorization().unwrap())
            .body(Body::empty())
            .unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);

        let envelope: EncryptedEnvelope = serde_json::from_slice(&body).unwrap();
        let page: OutboxPage =
            serde_json::from_slice(&handshake.open(&envelope, &owner).unwrap()).unwrap();
        assert!(page.messages.is_empty());
    }
}
