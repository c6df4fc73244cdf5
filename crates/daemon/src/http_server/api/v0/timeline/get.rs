use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::TimelineEntry;

use super::TimelineApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GetRequest {
    /// Local timeline entry id
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub entry: TimelineEntry,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<GetRequest>,
) -> Result<impl IntoResponse, TimelineApiError> {
    let entry = state
        .node()
        .sync()
        .timeline_entry(&req.id)
        .await?
        .ok_or_else(|| TimelineApiError::NotFound(req.id.clone()))?;
    Ok((http::StatusCode::OK, Json(GetResponse { entry })))
}

impl ApiRequest for GetRequest {
    type Response = GetResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/timeline/get")?;
        Ok(client.post(full_url).json(&self))
    }
}
