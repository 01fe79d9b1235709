//! The call to the backend's refresh endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::{ApiRequest, Credentials, RefreshRequest, RefreshResponse};
use crate::transport::{Transport, TransportError};

/// Why a refresh produced no usable credentials. Only logged and counted; the
/// coordinator treats every variant the same way.
#[derive(Debug, Error)]
pub enum RefreshFailure {
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),
    #[error("refresh transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),
    #[error("malformed refresh response: {0}")]
    Malformed(String),
}

impl RefreshFailure {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshFailure::Timeout(_) => "timeout",
            RefreshFailure::Transport(_) => "transport",
            RefreshFailure::Rejected(_) => "rejected",
            RefreshFailure::Malformed(_) => "malformed",
        }
    }
}

/// Exchanges a refresh token for a new pair via `POST <base><path>`.
pub struct RefreshCall {
    transport: Arc<dyn Transport>,
    url: String,
    timeout: Duration,
    metrics: Metrics,
}

impl RefreshCall {
    pub fn new(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        timeout: Duration,
        metrics: Metrics,
    ) -> Self {
        RefreshCall {
            transport,
            url: url.into(),
            timeout,
            metrics,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs one refresh bounded by the configured timeout. Exceeding it drops
    /// the in-flight exchange.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credentials, RefreshFailure> {
        let started = Instant::now();
        let result = match timeout(self.timeout, self.exchange(refresh_token)).await {
            Ok(result) => result,
            Err(_) => Err(RefreshFailure::Timeout(self.timeout)),
        };

        let label = match &result {
            Ok(_) => "success",
            Err(failure) => failure.label(),
        };
        self.metrics.record_refresh_attempt(label);
        self.metrics
            .record_refresh_duration(started.elapsed().as_secs_f64(), label);

        match &result {
            Ok(_) => info!(
                event_name = "client.refresh.succeeded",
                event_domain = "auth",
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Access token refreshed"
            ),
            Err(failure) => warn!(
                event_name = "client.refresh.failed",
                event_domain = "auth",
                reason = failure.label(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Token refresh failed: {}",
                failure
            ),
        }
        result
    }

    async fn exchange(&self, refresh_token: &str) -> Result<Credentials, RefreshFailure> {
        debug!("Calling refresh endpoint at '{}'", self.url);

        let request = ApiRequest::post(&self.url)
            .unauthenticated()
            .with_json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .map_err(RefreshFailure::Malformed)?;

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(RefreshFailure::Rejected(response.status));
        }

        let body: RefreshResponse = response.json().map_err(RefreshFailure::Malformed)?;
        Credentials::new(&body.access_token, Some(&body.refresh_token))
            .ok_or_else(|| RefreshFailure::Malformed("blank access token".to_string()))
    }
}
