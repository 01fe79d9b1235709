//! Client construction from configuration.
//!
//! Wires the credential store, the HTTP transport, metrics and the session
//! event bus into one [`AuthClient`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::client::AuthClient;
use crate::config::ConfigV1;
use crate::events::SessionEvents;
use crate::metrics::Metrics;
use crate::store::create_store;
use crate::transport::ReqwestTransport;

/// Builds a ready-to-use client from `config`.
///
/// # Errors
///
/// Returns an error if the credential store cannot be opened or the HTTP
/// client cannot be constructed.
pub async fn build_client(config: &ConfigV1) -> Result<AuthClient, String> {
    let store = create_store(&config.store).await?;
    let transport = Arc::new(ReqwestTransport::new(
        Duration::from_millis(config.request_timeout_in_ms),
        config.user_agent.as_deref(),
    )?);
    let events = SessionEvents::new(config.session.channel_capacity);
    let metrics = Metrics::new();

    info!(
        "Authenticated client ready for '{}' (refresh {})",
        config.base_url,
        if config.refresh.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(AuthClient::new(config, transport, store, events, metrics))
}
