use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::OutboxMessage;

use super::MsgApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct OutboxRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxResponse {
    pub messages: Vec<OutboxMessage>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(_req): Json<OutboxRequest>,
) -> Result<impl IntoResponse, MsgApiError> {
    let messages = state.node().relay().outbox().await?;
    Ok((http::StatusCode::OK, Json(OutboxResponse { messages })))
}

impl ApiRequest for OutboxRequest {
    type Response = OutboxResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/msg/outbox")?;
        Ok(client.post(full_url).json(&self))
    }
}
