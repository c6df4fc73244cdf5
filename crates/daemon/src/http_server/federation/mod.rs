//! The surface other nodes talk to: identity assets, feed, inbox and outbox.
//!
//! Every route here is reachable without any prior relationship. Anything
//! beyond public data is gated by the `LabrysBlade` credential carried in the
//! `Authorization` header and is returned encrypted to the caller.

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use http::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use http::StatusCode;

use common::protocol::IdentityAsset;

use crate::ServiceState;

mod feed;
mod identity;
mod inbox;
mod outbox;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/identity/public_signing_key", get(identity::public_key))
        .route("/identity/display_name", get(identity::display_name))
        .route("/identity/bio", get(identity::bio))
        .route("/identity/avatar", get(identity::avatar))
        .route("/feed", get(feed::handler))
        .route("/inbox", post(inbox::handler))
        .route("/outbox", get(outbox::handler))
        .with_state(state)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn asset_response(asset: IdentityAsset) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, asset.content_type)],
        asset.body,
    )
        .into_response()
}
