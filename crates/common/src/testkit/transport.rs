use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use parking_lot::RwLock;
use serde::Serialize;

use super::network::{Route, Routes, TestNode};
use crate::address::Address;
use crate::models::InboxNotification;
use crate::protocol::{
    FeedResponse, IdentityAsset, AVATAR_PATH, BIO_PATH, DISPLAY_NAME_PATH, FEED_PATH, INBOX_PATH,
    LAST_SEEN_PARAM, OUTBOX_PATH, PUBLIC_KEY_PATH,
};
use crate::relay::RelayError;
use crate::transport::{Request, Response, Transport, TransportError};

/// Delivers requests straight to the addressed node's handlers
///
/// Holds the routing table weakly; nodes own their transports, and the
/// network owns the nodes.
#[derive(Debug, Clone)]
pub struct TestTransport {
    routes: Weak<RwLock<HashMap<String, Route>>>,
}

impl TestTransport {
    pub(super) fn new(routes: &Routes) -> Self {
        Self {
            routes: Arc::downgrade(routes),
        }
    }

    fn target(&self, request: &Request) -> Result<TestNode, TransportError> {
        let uri = request.uri().to_string();
        let address =
            Address::parse(&uri).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let routes = self
            .routes
            .upgrade()
            .ok_or_else(|| TransportError::Unreachable("network is gone".into()))?;
        let routes = routes.read();
        match routes.get(&address.authority()) {
            Some(route) if route.online => Ok(route.node.clone()),
            Some(_) => Err(TransportError::Unreachable(format!("{} is offline", address))),
            None => Err(TransportError::Unreachable(format!("no node at {}", address))),
        }
    }
}

#[async_trait]
impl Transport for TestTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let node = self.target(&request)?;
        Ok(dispatch(&node, request).await)
    }
}

/// The federation surface of a node, minus HTTP
async fn dispatch(node: &TestNode, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match (request.method(), path.as_str()) {
        (&Method::GET, PUBLIC_KEY_PATH) => asset(node.identity().public_key_asset()),
        (&Method::GET, DISPLAY_NAME_PATH) => asset(node.identity().display_name_asset()),
        (&Method::GET, BIO_PATH) => asset(node.identity().bio_asset()),
        (&Method::GET, AVATAR_PATH) => match node.identity().avatar_asset() {
            Some(avatar) => asset(avatar),
            None => status(StatusCode::NOT_FOUND),
        },
        (&Method::GET, FEED_PATH) => {
            let last_seen = request.uri().query().and_then(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(k, _)| k == LAST_SEEN_PARAM)
                    .map(|(_, v)| v.into_owned())
            });
            match node
                .feed()
                .serve(authorization.as_deref(), last_seen.as_deref())
                .await
            {
                Ok(FeedResponse::Plain(page)) => json(&page),
                Ok(FeedResponse::Encrypted(envelope)) => json(&envelope),
                Err(e) => {
                    tracing::error!("feed request failed: {}", e);
                    status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        (&Method::POST, INBOX_PATH) => {
            let notification: InboxNotification = match serde_json::from_slice(request.body()) {
                Ok(notification) => notification,
                Err(_) => return status(StatusCode::BAD_REQUEST),
            };
            // handled inline so tests observe the effect when the call returns
            if let Err(e) = node.relay().on_notification(notification).await {
                tracing::warn!("failed to handle notification: {}", e);
            }
            status(StatusCode::OK)
        }
        (&Method::GET, OUTBOX_PATH) => {
            match node.relay().serve_outbox(authorization.as_deref()).await {
                Ok(envelope) => json(&envelope),
                Err(RelayError::Unauthenticated) => status(StatusCode::UNAUTHORIZED),
                Err(e) => {
                    tracing::error!("outbox request failed: {}", e);
                    status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        _ => status(StatusCode::NOT_FOUND),
    }
}

fn asset(asset: IdentityAsset) -> Response {
    let mut response = Response::new(asset.body);
    if let Ok(value) = asset.content_type.parse() {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

fn json<B: Serialize>(body: &B) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(bytes);
            response.headers_mut().insert(
                CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(_) => status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn status(code: StatusCode) -> Response {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = code;
    response
}
