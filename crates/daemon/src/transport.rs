use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use common::transport::{Request, Response, Transport, TransportError};

/// Outbound requests to other nodes over real HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let request = reqwest::Request::try_from(request)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        tracing::debug!(method = %request.method(), url = %request.url(), "outbound request");

        let response = self.client.execute(request).await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;

        let mut out = Response::new(body.to_vec());
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let request = http::Request::builder()
            .uri("http://127.0.0.1:1/api/identity/public_signing_key")
            .body(Vec::new())
            .unwrap();
        assert!(matches!(
            transport.send(request).await,
            Err(TransportError::Unreachable(_))
        ));
    }
}
