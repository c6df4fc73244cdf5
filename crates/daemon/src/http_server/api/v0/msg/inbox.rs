use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::InboxMessage;

use super::MsgApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct InboxRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxResponse {
    pub messages: Vec<InboxMessage>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(_req): Json<InboxRequest>,
) -> Result<impl IntoResponse, MsgApiError> {
    let messages = state.node().relay().inbox().await?;
    Ok((http::StatusCode::OK, Json(InboxResponse { messages })))
}

impl ApiRequest for InboxRequest {
    type Response = InboxResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/msg/inbox")?;
        Ok(client.post(full_url).json(&self))
    }
}
