use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::address::Address;
use common::models::Subscription;

use super::SubApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct AddRequest {
    /// Address of the node to follow, e.g. `alice.example:5000`
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddResponse {
    pub subscription: Subscription,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<AddRequest>,
) -> Result<impl IntoResponse, SubApiError> {
    let subscription = state.node().sync().subscribe(&req.address).await?;
    Ok((http::StatusCode::OK, Json(AddResponse { subscription })))
}

impl ApiRequest for AddRequest {
    type Response = AddResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/sub/add")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::{Request, StatusCode};

    use crate::http_server::{api_router, test_utils};

    #[tokio::test]
    async fn test_unreachable_address_is_404() {
        let router = api_router(test_utils::state("follower").await);
        let request = Request::post("/api/v0/sub/add")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"address":"http://127.0.0.1:1"}"#))
            .unwrap();
        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
