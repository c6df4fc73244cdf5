use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::SubApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RemoveRequest {
    /// Subscription id, as shown by `sub list`
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RemoveRequest>,
) -> Result<impl IntoResponse, SubApiError> {
    if !state.node().sync().unsubscribe(&req.id).await? {
        return Err(SubApiError::NotFound(req.id));
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
        let full_url = base_url.join("/api/v0/sub/remove")?;
        Ok(client.post(full_url).json(&self))
    }
}
