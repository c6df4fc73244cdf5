use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;

use common::feed::FeedError;
use common::protocol::FeedResponse;

use super::authorization;
use crate::ServiceState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub last_seen: Option<String>,
}

/// `GET /api/feed`: plain for anonymous callers, encrypted for verified ones
pub async fn handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Query(query): Query<FeedQuery>,
) -> Result<Response, FeedServeError> {
    let response = state
        .node()
        .feed()
        .serve(authorization(&headers), query.last_seen.as_deref())
        .await?;

    Ok(match response {
        FeedResponse::Plain(page) => (StatusCode::OK, Json(page)).into_response(),
        FeedResponse::Encrypted(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
    })
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct FeedServeError(#[from] FeedError);

impl IntoResponse for FeedServeError {
    fn into_response(self) -> Response {
        tracing::error!("failed to serve feed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use axum::body::Body;
    use http::header::AUTHORIZATION;
    use http::Request;

    use common::crypto::{ClientHandshake, EncryptedEnvelope, SecretKey};
    use common::models::Rule;
    use common::protocol::FeedPage;

    use super::*;
    use crate::http_server::{federation_router, test_utils};

    fn cats(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_anonymous_feed_is_plain_and_public() {
        let state = test_utils::state("anon-feed").await;
        let feed = state.node().feed();
        feed.publish(None, "hello world".into(), BTreeSet::new())
            .await
            .unwrap();
        feed.publish(None, "friends only".into(), cats(&["friends"]))
            .await
            .unwrap();
        let router = federation_router(state);

        let request = Request::get("/api/feed").body(Body::empty()).unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);

        let page: FeedPage = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].content, "hello world");
    }

    #[tokio::test]
    async fn test_verified_feed_is_encrypted_to_requester() {
        let state = test_utils::state("enc-feed").await;
        let owner = *state.node().public_key();
        let reader = SecretKey::generate();
        state
            .node()
            .permissions()
            .set_grant(reader.public(), Rule::categories(["friends"]))
            .await
            .unwrap();
        state
            .node()
            .feed()
            .publish(None, "friends only".into(), cats(&["friends"]))
            .await
            .unwrap();
        let router = federation_router(state);

        let handshake = ClientHandshake::new(&reader).unwrap();
        let request = Request::get("/api/feed")
            .header(AUTHORIZATION, handshake.authorization().unwrap())
            .body(Body::empty())
            .unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);

        let envelope: EncryptedEnvelope = serde_json::from_slice(&body).unwrap();
        let plaintext = handshake.open(&envelope, &owner).unwrap();
        let page: FeedPage = serde_json::from_slice(&plaintext).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].content, "friends only");
    }

    #[tokio::test]
    async fn test_garbage_credential_is_anonymous() {
        let state = test_utils::state("garbage-feed").await;
        state
            .node()
            .feed()
            .publish(None, "secret".into(), cats(&["friends"]))
            .await
            .unwrap();
        let router = federation_router(state);

        let request = Request::get("/api/feed")
            .header(AUTHORIZATION, "LabrysBlade not-json")
            .body(Body::empty())
            .unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let page: FeedPage = serde_json::from_slice(&body).unwrap();
        assert!(page.messages.is_empty());
    }
}
