use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use super::asset_response;
use crate::ServiceState;

pub async fn public_key(State(state): State<ServiceState>) -> Response {
    asset_response(state.node().identity().public_key_asset())
}

pub async fn display_name(State(state): State<ServiceState>) -> Response {
    asset_response(state.node().identity().display_name_asset())
}

pub async fn bio(State(state): State<ServiceState>) -> Response {
    asset_response(state.node().identity().bio_asset())
}

pub async fn avatar(State(state): State<ServiceState>) -> Response {
    match state.node().identity().avatar_asset() {
        Some(avatar) => asset_response(avatar),
        None => (StatusCode::NOT_FOUND, "no avatar").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::Request;

    use common::crypto::PublicKey;

    use super::*;
    use crate::http_server::{federation_router, test_utils};

    #[tokio::test]
    async fn test_public_key_round_trips() {
        let state = test_utils::state("ident").await;
        let expected = *state.node().public_key();
        let router = federation_router(state);

        let request = Request::get("/api/identity/public_signing_key")
            .body(Body::empty())
            .unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let key = PublicKey::from_base64(std::str::from_utf8(&body).unwrap()).unwrap();
        assert_eq!(key, expected);
    }

    #[tokio::test]
    async fn test_missing_avatar_is_404() {
        let router = federation_router(test_utils::state("faceless").await);
        let request = Request::get("/api/identity/avatar")
            .body(Body::empty())
            .unwrap();
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_display_name_is_text() {
        let router = federation_router(test_utils::state("named").await);
        let request = Request::get("/api/identity/display_name")
            .body(Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(router, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }
}
