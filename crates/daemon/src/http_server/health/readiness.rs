use std::sync::Arc;
use std::time::Duration;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::request::Parts;
use http::StatusCode;
use tokio::time::timeout;

use common::store::FeedStore;

use crate::service_state::BladeNode;
use crate::ServiceState;

/// Readiness reports failure when the check takes longer than this
const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum NotReady {
    #[error("record store is not answering")]
    Store,
}

#[async_trait]
pub trait Readiness: Send + Sync {
    async fn check(&self) -> Result<(), NotReady>;
}

/// Ready when the node's record store answers a read
struct StoreReadiness(BladeNode);

#[async_trait]
impl Readiness for StoreReadiness {
    async fn check(&self) -> Result<(), NotReady> {
        self.0
            .store()
            .feed_items()
            .await
            .map(|_| ())
            .map_err(|_| NotReady::Store)
    }
}

/// Extractor handing the handler whatever decides readiness
pub struct ReadinessCheck(Arc<dyn Readiness>);

impl std::fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReadinessCheck")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ReadinessCheck
where
    ServiceState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ();

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ServiceState::from_ref(state);
        Ok(ReadinessCheck(Arc::new(StoreReadiness(state.node().clone()))))
    }
}

#[tracing::instrument]
pub async fn handler(check: ReadinessCheck) -> Response {
    let outcome = match timeout(READINESS_TIMEOUT, check.0.check()).await {
        Ok(outcome) => outcome.map_err(|e| e.to_string()),
        Err(_) => Err("readiness check timed out".to_string()),
    };

    match outcome {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(message) => {
            tracing::warn!(%message, "not ready");
            let body = serde_json::json!({"status": "failure", "message": message});
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::Request;

    use super::*;
    use crate::http_server::test_utils;

    struct Fixed(fn() -> Result<(), NotReady>);

    #[async_trait]
    impl Readiness for Fixed {
        async fn check(&self) -> Result<(), NotReady> {
            (self.0)()
        }
    }

    #[tokio::test]
    async fn test_check_outcomes() {
        let ready = handler(ReadinessCheck(Arc::new(Fixed(|| Ok(()))))).await;
        assert_eq!(ready.status(), StatusCode::OK);

        let store_down = handler(ReadinessCheck(Arc::new(Fixed(|| Err(NotReady::Store))))).await;
        assert_eq!(store_down.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_fresh_node_is_ready() {
        let router = crate::http_server::api_router(test_utils::state("ready").await);
        let request = Request::get("/_status/readyz").body(Body::empty()).unwrap();
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
