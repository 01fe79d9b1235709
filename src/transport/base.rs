use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ApiRequest, ApiResponse};

/// A failure below HTTP: the exchange produced no status code at all.
///
/// These are never retried by the client; they reach the caller unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::InvalidRequest(_) => "invalid_request",
            TransportError::Other(_) => "other",
        }
    }
}

/// Performs exactly one request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}
