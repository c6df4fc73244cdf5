use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use http::StatusCode;

use common::models::Rule;
use common::permissions::PermissionError;

use crate::ServiceState;

pub mod grant;
pub mod group_create;
pub mod group_remove;
pub mod list;
pub mod revoke;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/grant", post(grant::handler))
        .route("/revoke", post(revoke::handler))
        .route("/list", post(list::handler))
        .route("/group/create", post(group_create::handler))
        .route("/group/remove", post(group_remove::handler))
        .with_state(state)
}

/// `--all` wins over any `--category`
fn rule(all: bool, categories: Vec<String>) -> Rule {
    if all {
        Rule::All
    } else {
        Rule::categories(categories)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PermApiError {
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for PermApiError {
    fn into_response(self) -> Response {
        match self {
            PermApiError::Permission(e @ PermissionError::InvalidGroup(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            PermApiError::Permission(e @ PermissionError::GroupNotFound(_)) => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            e @ PermApiError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
            e => {
                tracing::error!("permission API error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "unknown server error").into_response()
            }
        }
    }
}
