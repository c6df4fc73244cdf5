//! Outbound requests to other nodes over an injected [`Transport`]

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::address::Address;
use crate::crypto::{ClientHandshake, EncryptedEnvelope, HandshakeError, PublicKey, SecretKey};
use crate::models::InboxNotification;
use crate::protocol::INBOX_PATH;
use crate::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum PullError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("response is not an encrypted envelope")]
    NotEncrypted,
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error("invalid response body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),
}

/// Unauthenticated GET. Returns the declared content type and the body.
pub async fn get<T: Transport>(
    transport: &T,
    url: &Url,
) -> Result<(Option<String>, Vec<u8>), PullError> {
    let request = http::Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .body(Vec::new())?;
    let response = transport.send(request).await?;
    if !response.status().is_success() {
        return Err(PullError::Status(response.status()));
    }
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok((content_type, response.into_body()))
}

/// Authenticated GET whose response must come back encrypted by
/// `expected_responder`.
///
/// Any failure to verify or decrypt is an error; the caller never sees a
/// partially trusted body.
pub async fn authenticated_get<T, R>(
    transport: &T,
    identity: &SecretKey,
    url: &Url,
    expected_responder: &PublicKey,
) -> Result<R, PullError>
where
    T: Transport,
    R: DeserializeOwned,
{
    let handshake = ClientHandshake::new(identity)?;
    let request = http::Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .header(AUTHORIZATION, handshake.authorization()?)
        .body(Vec::new())?;

    let response = transport.send(request).await?;
    if !response.status().is_success() {
        return Err(PullError::Status(response.status()));
    }

    let envelope: EncryptedEnvelope =
        serde_json::from_slice(response.body()).map_err(|_| PullError::NotEncrypted)?;
    let plaintext = handshake.open(&envelope, expected_responder)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// POST a JSON body and discard the response
pub async fn post_json<T, B>(transport: &T, url: &Url, body: &B) -> Result<(), PullError>
where
    T: Transport,
    B: Serialize,
{
    let request = http::Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?)?;
    let response = transport.send(request).await?;
    if !response.status().is_success() {
        return Err(PullError::Status(response.status()));
    }
    Ok(())
}

/// Best-effort `POST /api/inbox` to `target`
pub async fn notify<T: Transport>(
    transport: &T,
    target: &Address,
    notification: &InboxNotification,
) -> Result<(), PullError> {
    post_json(transport, &target.endpoint(INBOX_PATH), notification).await
}
