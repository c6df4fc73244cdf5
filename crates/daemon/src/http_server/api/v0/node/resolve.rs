use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::address::Address;
use common::models::KnownNode;

use super::NodeApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Look up the node at an address, caching it on first contact
#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct ResolveRequest {
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub node: KnownNode,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ResolveRequest>,
) -> Result<impl IntoResponse, NodeApiError> {
    let node = state
        .node()
        .directory()
        .resolve(&req.address)
        .await?
        .ok_or_else(|| NodeApiError::Unreachable(req.address.clone()))?;
    Ok((http::StatusCode::OK, Json(ResolveResponse { node })))
}

impl ApiRequest for ResolveRequest {
    type Response = ResolveResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/node/resolve")?;
        Ok(client.post(full_url).json(&self))
    }
}
