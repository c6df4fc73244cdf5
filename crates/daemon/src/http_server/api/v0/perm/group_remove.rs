use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::PermApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GroupRemoveRequest {
    /// Group id
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRemoveResponse {
    pub id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<GroupRemoveRequest>,
) -> Result<impl IntoResponse, PermApiError> {
    if !state.node().permissions().remove_group(&req.id).await? {
        return Err(PermApiError::NotFound(format!("group {}", req.id)));
    }
    Ok((http::StatusCode::OK, Json(GroupRemoveResponse { id: req.id })))
}

impl ApiRequest for GroupRemoveRequest {
    type Response = GroupRemoveResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/perm/group/remove")?;
        Ok(client.post(full_url).json(&self))
    }
}
