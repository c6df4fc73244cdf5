use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::crypto::PublicKey;

use super::PermApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RevokeRequest {
    /// Requester whose direct grant is dropped
    pub subject: PublicKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    pub subject: PublicKey,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RevokeRequest>,
) -> Result<impl IntoResponse, PermApiError> {
    if !state.node().permissions().remove_grant(&req.subject).await? {
        return Err(PermApiError::NotFound(format!("grant for {}", req.subject)));
    }
    Ok((
        http::StatusCode::OK,
        Json(RevokeResponse {
            subject: req.subject,
        }),
    ))
}

impl ApiRequest for RevokeRequest {
    type Response = RevokeResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/perm/revoke")?;
        Ok(client.post(full_url).json(&self))
    }
}
