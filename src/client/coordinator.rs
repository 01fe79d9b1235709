//! Authenticated client and its single-flight refresh coordinator.
//!
//! Every authenticated request is decorated with the current access token.
//! A 401 is resolved inside this module before the caller sees anything:
//!
//! - refresh disabled, or no refresh token: clear credentials, broadcast a
//!   session-expired event and return the original 401;
//! - the stored token already differs from the one the request carried: a
//!   refresh finished in the meantime, so replay once with the stored token;
//! - otherwise try to claim the refresh slot. The claimant refreshes (bounded
//!   by the refresh timeout), persists the new pair and replays. A request that
//!   finds the slot taken does not wait: it replays once with whatever token
//!   is stored at that moment.
//!
//! A 401 from any replay is returned as-is. Non-401 responses and transport
//! failures are never retried here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::injector::authorize;
use super::refresh::RefreshCall;
use crate::config::ConfigV1;
use crate::events::{SessionEvent, SessionEvents};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::{ApiRequest, ApiResponse, Credentials};
use crate::store::CredentialStore;
use crate::transport::{Transport, TransportError};
use crate::utils::log_throttle::should_emit;

const CONTENDER_LOG_WINDOW: Duration = Duration::from_secs(5);

/// Whether a refresh is currently running for this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    RefreshInFlight,
}

/// The refresh slot: an atomic flag claimed by test-and-set and released when
/// the guard drops, including when the claimant's future is cancelled.
#[derive(Default)]
struct RefreshSlot {
    in_flight: AtomicBool,
}

struct RefreshSlotGuard<'a> {
    slot: &'a RefreshSlot,
}

impl RefreshSlot {
    fn try_claim(&self) -> Option<RefreshSlotGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshSlotGuard { slot: self })
    }

    fn state(&self) -> RefreshState {
        if self.in_flight.load(Ordering::Acquire) {
            RefreshState::RefreshInFlight
        } else {
            RefreshState::Idle
        }
    }
}

impl Drop for RefreshSlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.in_flight.store(false, Ordering::Release);
    }
}

struct Inner {
    base_url: String,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    events: SessionEvents,
    metrics: Metrics,
    /// `None` when refresh is disabled for this client.
    refresher: Option<RefreshCall>,
    refresh_slot: RefreshSlot,
    expired_message: String,
}

/// HTTP client that attaches bearer credentials and recovers from expired
/// access tokens. Clones share one coordinator.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

impl AuthClient {
    /// Creates a client for `config.base_url`. The refresh call goes through the
    /// same transport as ordinary requests.
    pub fn new(
        config: &ConfigV1,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        events: SessionEvents,
        metrics: Metrics,
    ) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let refresher = if config.refresh.enabled {
            Some(RefreshCall::new(
                transport.clone(),
                join_url(&base_url, &config.refresh.path),
                Duration::from_millis(config.refresh.timeout_in_ms),
                metrics.clone(),
            ))
        } else {
            info!("Token refresh is disabled; every 401 ends the session.");
            None
        };

        AuthClient {
            inner: Arc::new(Inner {
                base_url,
                transport,
                store,
                events,
                metrics,
                refresher,
                refresh_slot: RefreshSlot::default(),
                expired_message: config.session.expired_message.clone(),
            }),
        }
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.inner.refresh_slot.state()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Absolute URL for an API path; absolute URLs are passed through.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.inner.base_url, path)
    }

    /// Stores credentials obtained from a login flow.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), String> {
        self.inner
            .store
            .set_tokens(
                &credentials.access_token,
                credentials.refresh_token.as_deref(),
            )
            .await
    }

    /// User-initiated logout. Clears credentials without a session-expired event.
    pub async fn logout(&self) -> Result<(), String> {
        self.inner.store.clear_all().await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.execute(ApiRequest::get(self.url(path))).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.execute(ApiRequest::delete(self.url(path))).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse, TransportError> {
        let request = ApiRequest::post(self.url(path))
            .with_json(body)
            .map_err(TransportError::InvalidRequest)?;
        self.execute(request).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<ApiResponse, TransportError> {
        let request = ApiRequest::put(self.url(path))
            .with_json(body)
            .map_err(TransportError::InvalidRequest)?;
        self.execute(request).await
    }

    /// Sends `request` and returns its final outcome: the response (possibly
    /// from a replay after refresh) or the transport failure.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let span = info_span!(
            "auth_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        if !request.authenticated {
            return self.send(request).await;
        }

        let (authorized, sent_token) = authorize(&request, self.inner.store.as_ref()).await;
        let response = self.send(authorized).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!("Received 401, entering refresh coordination");
        self.handle_unauthorized(request, sent_token, response).await
    }

    async fn handle_unauthorized(
        &self,
        request: ApiRequest,
        sent_token: Option<String>,
        original: ApiResponse,
    ) -> Result<ApiResponse, TransportError> {
        let Some(refresher) = self.inner.refresher.as_ref() else {
            self.inner.metrics.record_unauthorized("refresh_disabled");
            self.expire_session("refresh disabled").await;
            return Ok(original);
        };

        if self.token_changed_since(sent_token.as_deref()).await {
            self.inner.metrics.record_unauthorized("stale_token");
            debug!("Stored token changed since dispatch; replaying with the current one");
            return self.replay(&request).await;
        }

        let Some(guard) = self.inner.refresh_slot.try_claim() else {
            self.inner.metrics.record_unauthorized("contender");
            if let Some(suppressed_count) =
                should_emit("client.refresh.contender", CONTENDER_LOG_WINDOW)
            {
                info!(
                    event_name = "client.refresh.contender",
                    event_domain = "auth",
                    suppressed_count,
                    "Refresh already in flight; replaying with the stored token"
                );
            }
            return self.replay(&request).await;
        };

        // Claimant. Re-check under the slot: a refresh may have completed
        // between the first comparison and the claim.
        let credentials = self.inner.store.get_credentials().await;
        if let Some(current) = &credentials {
            if sent_token.as_deref() != Some(current.access_token.as_str()) {
                drop(guard);
                self.inner.metrics.record_unauthorized("stale_token");
                return self.replay(&request).await;
            }
        }

        let Some(refresh_token) = credentials.and_then(|c| c.refresh_token) else {
            drop(guard);
            self.inner.metrics.record_unauthorized("no_refresh_token");
            self.expire_session("no refresh token").await;
            return Ok(original);
        };

        self.inner.metrics.record_unauthorized("claimant");
        info!(
            event_name = "client.refresh.claimed",
            event_domain = "auth",
            "Claimed refresh slot"
        );

        let refreshed = match refresher.refresh(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(_) => {
                // Credentials are cleared before the slot is released.
                self.expire_session("refresh failed").await;
                drop(guard);
                return Ok(original);
            }
        };

        if let Err(e) = self
            .inner
            .store
            .set_tokens(
                &refreshed.access_token,
                refreshed.refresh_token.as_deref(),
            )
            .await
        {
            error!("Failed to persist refreshed credentials: {}", e);
            self.expire_session("could not persist refreshed credentials")
                .await;
            drop(guard);
            return Ok(original);
        }
        drop(guard);

        self.replay(&request).await
    }

    /// True when the store holds a token different from the one a request was sent with.
    async fn token_changed_since(&self, sent_token: Option<&str>) -> bool {
        match self.inner.store.get_access_token().await {
            Some(current) => sent_token != Some(current.as_str()),
            None => false,
        }
    }

    /// Sends the original request once more with the currently stored token.
    async fn replay(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let (authorized, _) = authorize(request, self.inner.store.as_ref()).await;
        let response = self.send(authorized).await?;
        if response.is_unauthorized() {
            debug!("Replay was rejected with 401 as well; returning it to the caller");
        }
        Ok(response)
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.inner.transport.send(request).await.inspect_err(|e| {
            self.inner.metrics.record_transport_error(e.kind());
            warn!(
                event_name = "client.transport.error",
                event_domain = "transport",
                kind = e.kind(),
                "Transport failure: {}",
                e
            );
        })
    }

    /// Terminal failure: drop credentials and tell the application.
    async fn expire_session(&self, cause: &str) {
        if let Err(e) = self.inner.store.clear_all().await {
            error!("Failed to clear credentials: {}", e);
        }
        self.inner.metrics.record_session_expired();
        let receivers = self.inner.events.publish_expired(&self.inner.expired_message);
        warn!(
            event_name = "client.session.expired",
            event_domain = "auth",
            cause,
            receivers,
            "Session expired; credentials cleared"
        );
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
