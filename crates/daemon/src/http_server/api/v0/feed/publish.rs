use std::collections::BTreeSet;

use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::FeedItem;

use super::FeedApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct PublishRequest {
    /// Item body
    pub content: String,

    /// Item type, `post` when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Restrict the item to requesters holding this category (repeatable).
    /// Items without categories are public.
    #[serde(default)]
    #[arg(long = "category")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub item: FeedItem,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, FeedApiError> {
    let categories: BTreeSet<String> = req.categories.into_iter().collect();
    let item = state
        .node()
        .feed()
        .publish(req.kind, req.content, categories)
        .await?;

    Ok((http::StatusCode::OK, Json(PublishResponse { item })))
}

impl ApiRequest for PublishRequest {
    type Response = PublishResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/feed/publish")?;
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

    fn publish(body: serde_json::Value) -> Request<Body> {
        Request::post("/api/v0/feed/publish")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_with_categories() {
        let state = test_utils::state("publisher").await;
        let router = api_router(state.clone());

        let (status, body) = test_utils::send(
            &router,
            publish(serde_json::json!({"content": "hi", "categories": ["friends"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let response: PublishResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.item.kind, "post");
        assert!(response.item.categories.contains("friends"));
        assert_eq!(state.node().feed().items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_content_is_bad_request() {
        let router = api_router(test_utils::state("blank").await);
        let (status, _) =
            test_utils::send(&router, publish(serde_json::json!({"content": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
