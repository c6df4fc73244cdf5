use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

use common::models::InboxNotification;
use common::relay::{notification_sender, RelayError};

use crate::ServiceState;

/// `POST /api/inbox`
///
/// A well-formed notification is acknowledged at once and the pull back to
/// the sender runs in the background. When every pull permit is taken the
/// notification is refused with 503; the messages stay in the sender's
/// outbox for its next notification.
pub async fn handler(
    State(state): State<ServiceState>,
    Json(notification): Json<InboxNotification>,
) -> Result<Response, InboxError> {
    let (claimed, address) = notification_sender(&notification)?;
    tracing::debug!(
        from = %address,
        key = %claimed,
        kind = ?notification.kind,
        "inbox notification"
    );

    let permit = state
        .notification_permits()
        .clone()
        .try_acquire_owned()
        .map_err(|_| InboxError::Busy)?;

    tokio::spawn(async move {
        let _permit = permit;
        match state.node().relay().on_notification(notification).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "pulled private messages"),
            Err(e) => tracing::warn!("failed to handle notification: {}", e),
        }
    });

    Ok(StatusCode::OK.into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("too many notifications in flight")]
    Busy,
}

impl IntoResponse for InboxError {
    fn into_response(self) -> Response {
        match self {
            InboxError::Relay(RelayError::InvalidNotification(reason)) => {
                (StatusCode::BAD_REQUEST, format!("invalid notification: {}", reason))
                    .into_response()
            }
            InboxError::Busy => {
                tracing::warn!("refusing notification, pull limit reached");
                (StatusCode::SERVICE_UNAVAILABLE, "busy, notify again later").into_response()
            }
            InboxError::Relay(e) => {
                tracing::error!("failed to accept notification: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::Request;

    use common::crypto::SecretKey;

    use super::*;
    use crate::http_server::{federation_router, test_utils};

    fn notification(url: &str, key: &str, kind: &str) -> Request<Body> {
        let body = serde_json::json!({
            "url": url,
            "public_signing_key": key,
            "type": kind,
        });
        Request::post("/api/inbox")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_notification_is_acknowledged() {
        let router = federation_router(test_utils::state("inbox").await);
        let key = SecretKey::generate().public().to_base64();
        let request = notification("http://sender.test", &key, "new_private_messages");
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_key_is_rejected() {
        let router = federation_router(test_utils::state("inbox-key").await);
        let request = notification("http://sender.test", "not-a-key", "new_private_messages");
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected() {
        let router = federation_router(test_utils::state("inbox-url").await);
        let key = SecretKey::generate().public().to_base64();
        let request = notification("ftp://sender.test", &key, "new_private_messages");
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_notification_type_is_rejected() {
        let router = federation_router(test_utils::state("inbox-bad").await);
        let request = notification("http://sender.test", "x", "party_invite");
        let (status, _) = test_utils::send(&router, request).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_saturated_inbox_is_busy() {
        let node = test_utils::node("inbox-busy").await;
        let state = ServiceState::with_notification_limit(node, 1);
        let _held = state
            .notification_permits()
            .clone()
            .try_acquire_owned()
            .unwrap();
        let router = federation_router(state.clone());

        let key = SecretKey::generate().public().to_base64();
        let request = notification("http://sender.test", &key, "new_private_messages");
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(state.notification_permits().available_permits(), 0);
    }
}
