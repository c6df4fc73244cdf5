use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::models::TimelineEntry;

use super::TimelineApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Sync every subscription, then list the timeline newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListRequest {
    /// Show at most this many entries
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub entries: Vec<TimelineEntry>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ListRequest>,
) -> Result<impl IntoResponse, TimelineApiError> {
    let mut entries = state.node().sync().timeline().await?;
    if let Some(limit) = req.limit {
        entries.truncate(limit);
    }
    Ok((http::StatusCode::OK, Json(ListResponse { entries })))
}

impl ApiRequest for ListRequest {
    type Response = ListResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/timeline/list")?;
        Ok(client.post(full_url).json(&self))
    }
}
