use axum::extract::DefaultBodyLimit;
use axum::{Extension, Router};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use http::Method;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod config;
mod federation;
mod handlers;
mod health;

pub use config::Config;

use crate::ServiceState;

const API_PREFIX: &str = "/api";
const STATUS_PREFIX: &str = "/_status";

/// Maximum request body size in bytes (1 MB)
pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

/// Routes other nodes call: identity, feed, inbox, outbox
pub fn federation_router(state: ServiceState) -> Router {
    // Federation CORS: any origin may read a public feed
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![ACCEPT, ORIGIN, AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest(API_PREFIX, federation::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
                .layer(cors),
        )
        .with_state(state)
}

/// Routes the owner's CLI calls
pub fn api_router(state: ServiceState) -> Router {
    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .nest(API_PREFIX, api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

/// Run the federation HTTP server (public, serves /_status + /api/{identity,feed,inbox,outbox}).
pub async fn run_federation(
    config: Config,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let router = federation_router(state);
    serve("Federation", config, router, shutdown_rx).await
}

/// Run the API HTTP server (private, serves /_status + /api/v0 routes).
pub async fn run_api(
    config: Config,
    state: ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let router = api_router(state);
    serve("API", config, router, shutdown_rx).await
}

async fn serve(
    name: &str,
    config: Config,
    router: Router,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router.layer(Extension(config)).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "{} server listening", name);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::time::Duration;

    use axum::body::Body;
    use axum::Router;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    use common::address::Address;
    use common::node::Node;

    use crate::database::Database;
    use crate::service_state::BladeNode;
    use crate::transport::HttpTransport;
    use crate::ServiceState;

    /// A node on an in-memory database that never reaches the network
    pub async fn node(name: &str) -> BladeNode {
        Node::builder()
            .address(Address::parse(&format!("{}.test", name)).unwrap())
            .store(Database::in_memory().await.unwrap())
            .transport(HttpTransport::new(Duration::from_millis(100)).unwrap())
            .build()
            .unwrap()
    }

    pub async fn state(name: &str) -> ServiceState {
        ServiceState::new(node(name).await)
    }

    pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }
}
