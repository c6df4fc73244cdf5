use async_trait::async_trait;

pub type Request = http::Request<Vec<u8>>;
pub type Response = http::Response<Vec<u8>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Outbound HTTP to other nodes
///
/// Non-success statuses are returned as responses, not errors. Timeouts are
/// the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug + Clone + 'static {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}
