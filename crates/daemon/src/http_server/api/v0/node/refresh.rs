use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::address::Address;
use common::models::KnownNode;

use super::NodeApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Re-fetch a node's profile and replace the cached record
#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RefreshRequest {
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub node: KnownNode,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, NodeApiError> {
    let node = state
        .node()
        .directory()
        .refresh(&req.address)
        .await?
        .ok_or_else(|| NodeApiError::Unreachable(req.address.clone()))?;
    Ok((http::StatusCode::OK, Json(RefreshResponse { node })))
}

impl ApiRequest for RefreshRequest {
    type Response = RefreshResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/node/refresh")?;
        Ok(client.post(full_url).json(&self))
    }
}
