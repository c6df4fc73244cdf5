use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::MsgApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RemoveRequest {
    /// Inbox message local id, or outbox message id with `--outbox`
    pub id: String,

    /// Remove from the outbox instead of the inbox
    #[serde(default)]
    #[arg(long)]
    pub outbox: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RemoveRequest>,
) -> Result<impl IntoResponse, MsgApiError> {
    let relay = state.node().relay();
    let removed = if req.outbox {
        relay.remove_outbox(&req.id).await?
    } else {
        relay.remove_inbox(&req.id).await?
    };
    if !removed {
        return Err(MsgApiError::NotFound(req.id));
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
        let full_url = base_url.join("/api/v0/msg/remove")?;
        Ok(client.post(full_url).json(&self))
    }
}
