use axum::extract::{Json, State};
use axum::response::IntoResponse;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::crypto::PublicKey;
use common::models::PermissionGrant;

use super::{rule, PermApiError};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Set the direct grant for one requester, replacing any earlier one
#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GrantRequest {
    /// Requester's public key
    pub subject: PublicKey,

    /// Unlock every category
    #[serde(default)]
    #[arg(long)]
    pub all: bool,

    /// Unlock this category (repeatable). No categories revokes the grant.
    #[serde(default)]
    #[arg(long = "category")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantResponse {
    /// `None` when the rule granted nothing and the grant was removed
    pub grant: Option<PermissionGrant>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<GrantRequest>,
) -> Result<impl IntoResponse, PermApiError> {
    let grant = state
        .node()
        .permissions()
        .set_grant(req.subject, rule(req.all, req.categories))
        .await?;
    Ok((http::StatusCode::OK, Json(GrantResponse { grant })))
}

impl ApiRequest for GrantRequest {
    type Response = GrantResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/perm/grant")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use http::{Request, StatusCode};

    use common::crypto::SecretKey;
    use common::models::Rule;

    use super::*;
    use crate::http_server::{api_router, test_utils};

    fn grant(body: serde_json::Value) -> Request<Body> {
        Request::post("/api/v0/perm/grant")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_grant_then_empty_rule_revokes() {
        let state = test_utils::state("granter").await;
        let router = api_router(state.clone());
        let friend = SecretKey::generate().public();

        let (status, body) = test_utils::send(
            &router,
            grant(serde_json::json!({"subject": friend, "categories": ["friends"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: GrantResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            response.grant.map(|g| g.rule),
            Some(Rule::categories(["friends"]))
        );

        let (status, body) =
            test_utils::send(&router, grant(serde_json::json!({"subject": friend}))).await;
        assert_eq!(status, StatusCode::OK);
        let response: GrantResponse = serde_json::from_slice(&body).unwrap();
        assert!(response.grant.is_none());
        assert!(state.node().permissions().grants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_flag_wins() {
        let state = test_utils::state("granter-all").await;
        let router = api_router(state.clone());
        let friend = SecretKey::generate().public();

        let (status, _) = test_utils::send(
            &router,
            grant(serde_json::json!({"subject": friend, "all": true, "categories": ["x"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let grants = state.node().permissions().grants().await.unwrap();
        assert_eq!(grants[0].rule, Rule::All);
    }
}
