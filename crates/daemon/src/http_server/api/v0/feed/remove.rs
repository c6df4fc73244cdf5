use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::FeedApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RemoveRequest {
    /// Feed item id
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RemoveRequest>,
) -> Result<impl IntoResponse, FeedApiError> {
    if !state.node().feed().remove(&req.id).await? {
        return Err(FeedApiError::NotFound(req.id));
    }
    Ok((http::StatusCode::OK, Json(RemoveResponse { id: req.id })))
}

impl ApiRequest for RemoveRequest {
    type Response = RemoveResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/feed/remove")?;
        Ok(client.post(full_url).json(&self))
    }
}
