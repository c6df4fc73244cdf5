use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::crypto::PublicKey;
use common::models::OutboxMessage;

use super::MsgApiError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct SendRequest {
    /// Recipient's public key; the node must have been resolved before
    pub recipient: PublicKey,

    /// Message body
    pub content: String,

    /// Message type, `post` when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub message: OutboxMessage,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<SendRequest>,
) -> Result<impl IntoResponse, MsgApiError> {
    let message = state
        .node()
        .relay()
        .send(&req.recipient, req.kind, req.content)
        .await?;
    Ok((http::StatusCode::OK, Json(SendResponse { message })))
}

impl ApiRequest for SendRequest {
    type Response = SendResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/msg/send")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::{Request, StatusCode};

    use common::crypto::SecretKey;

    use crate::http_server::{api_router, test_utils};

    #[tokio::test]
    async fn test_send_to_unknown_key_is_404() {
        let state = test_utils::state("sender").await;
        let router = api_router(state.clone());
        let stranger = SecretKey::generate().public();
        let body = serde_json::json!({"recipient": stranger, "content": "hi"});
        let request = Request::post("/api/v0/msg/send")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let (status, _) = test_utils::send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(state.node().relay().outbox().await.unwrap().is_empty());
    }
}
