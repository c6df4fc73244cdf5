use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::KnownNode;

use super::NodeApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub nodes: Vec<KnownNode>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(_req): Json<ListRequest>,
) -> Result<impl IntoResponse, NodeApiError> {
    let nodes = state.node().directory().all().await?;
    Ok((http::StatusCode::OK, Json(ListResponse { nodes })))
}

impl ApiRequest for ListRequest {
    type Response = ListResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/node/list")?;
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
    async fn test_fresh_node_knows_nobody() {
        let router = api_router(test_utils::state("hermit").await);
        let request = Request::post("/api/v0/node/list")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let response: ListResponse = serde_json::from_slice(&body).unwrap();
        assert!(response.nodes.is_empty());
    }
}
