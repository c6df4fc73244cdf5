use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::sync::SyncReport;

use super::SubApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct SyncRequest {
    /// Pull only this subscription; every subscription when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub report: SyncReport,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<SyncRequest>,
) -> Result<impl IntoResponse, SubApiError> {
    let sync = state.node().sync();
    let report = match req.id {
        Some(id) => {
            if sync.subscriptions().await?.iter().all(|s| s.id != id) {
                return Err(SubApiError::NotFound(id));
            }
            SyncReport {
                synced: 1,
                failed: Vec::new(),
                new_entries: sync.sync_subscription(&id).await?,
            }
        }
        None => sync.sync().await?,
    };
    Ok((http::StatusCode::OK, Json(SyncResponse { report })))
}

impl ApiRequest for SyncRequest {
    type Response = SyncResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/sub/sync")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::{Request, StatusCode};

    use super::*;
    use crate::http_server::{api_router, test_utils};

    #[tokio::test]
    async fn test_sync_without_subscriptions_is_empty() {
        let router = api_router(test_utils::state("lonely").await);
        let request = Request::post("/api/v0/sub/sync")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let response: SyncResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.report, SyncReport::default());
    }

    #[tokio::test]
    async fn test_sync_unknown_subscription_is_404() {
        let router = api_router(test_utils::state("lonely-one").await);
        let request = Request::post("/api/v0/sub/sync")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"id":"nope"}"#))
            .unwrap();
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
