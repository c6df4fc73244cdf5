use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::{PermissionGrant, PermissionGroup};

use super::PermApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub grants: Vec<PermissionGrant>,
    pub groups: Vec<PermissionGroup>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(_req): Json<ListRequest>,
) -> Result<impl IntoResponse, PermApiError> {
    let permissions = state.node().permissions();
    let grants = permissions.grants().await?;
    let groups = permissions.groups().await?;
    Ok((http::StatusCode::OK, Json(ListResponse { grants, groups })))
}

impl ApiRequest for ListRequest {
    type Response = ListResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/perm/list")?;
        Ok(client.post(full_url).json(&self))
    }
}
