use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::crypto::PublicKey;
use common::models::PermissionGroup;

use super::{rule, PermApiError};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GroupCreateRequest {
    pub name: String,

    #[serde(default)]
    #[arg(long, default_value = "")]
    pub description: String,

    /// Member public key (repeatable)
    #[serde(default)]
    #[arg(long = "member")]
    pub members: Vec<PublicKey>,

    /// Members see every category
    #[serde(default)]
    #[arg(long)]
    pub all: bool,

    /// Category members may see (repeatable)
    #[serde(default)]
    #[arg(long = "category")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreateResponse {
    pub group: PermissionGroup,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<GroupCreateRequest>,
) -> Result<impl IntoResponse, PermApiError> {
    let group = state
        .node()
        .permissions()
        .create_group(
            req.name,
            req.description,
            req.members.into_iter().collect(),
            rule(req.all, req.categories),
        )
        .await?;
    Ok((http::StatusCode::OK, Json(GroupCreateResponse { group })))
}

impl ApiRequest for GroupCreateRequest {
    type Response = GroupCreateResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/perm/group/create")?;
        Ok(client.post(full_url).json(&self))
    }
}
