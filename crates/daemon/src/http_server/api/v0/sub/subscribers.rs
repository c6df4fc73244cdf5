use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::Subscriber;

use super::SubApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Nodes that announced a subscription to our feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct SubscribersRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribersResponse {
    pub subscribers: Vec<Subscriber>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(_req): Json<SubscribersRequest>,
) -> Result<impl IntoResponse, SubApiError> {
    let subscribers = state.node().relay().subscribers().await?;
    Ok((http::StatusCode::OK, Json(SubscribersResponse { subscribers })))
}

impl ApiRequest for SubscribersRequest {
    type Response = SubscribersResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/sub/subscribers")?;
        Ok(client.post(full_url).json(&self))
    }
}
