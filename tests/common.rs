#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use authclient::client::AuthClient;
use authclient::config::{Config, ConfigV1};
use authclient::events::SessionEvents;
use authclient::metrics::Metrics;
use authclient::models::{ApiRequest, ApiResponse, Credentials};
use authclient::store::{CredentialStore, MemoryStore};
use authclient::transport::{Transport, TransportError};
use figment::{
    Figment,
    providers::{Format, Yaml},
};
use futures::future::{BoxFuture, FutureExt};
use http::{HeaderMap, Method, StatusCode};

pub const BACKEND_URL: &str = "http://backend.test";

pub fn parse_config(yaml: &str) -> ConfigV1 {
    let config: Config = Figment::new()
        .merge(Yaml::string(yaml))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

/// Config pointing at `base_url` with the given refresh timeout.
pub fn config_for(base_url: &str, refresh_timeout_ms: u64) -> ConfigV1 {
    parse_config(&format!(
        r#"
version: "1.0.0"
base_url: "{base_url}"
request_timeout_in_ms: 5000
refresh:
  enabled: true
  timeout_in_ms: {refresh_timeout_ms}
logging:
  level: "warn"
  format: "json"
"#
    ))
}

pub fn memory_store(access: &str, refresh: Option<&str>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_credentials(
        Credentials::new(access, refresh).expect("test credentials must not be blank"),
    ))
}

pub fn build_client(
    config: &ConfigV1,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
) -> AuthClient {
    AuthClient::new(
        config,
        transport,
        store,
        SessionEvents::new(16),
        Metrics::new(),
    )
}

pub fn response(status: u16, body: &str) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(
        StatusCode::from_u16(status).expect("valid status"),
        HeaderMap::new(),
        body.to_string(),
    ))
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

type Handler =
    Arc<dyn Fn(RecordedCall) -> BoxFuture<'static, Result<ApiResponse, TransportError>> + Send + Sync>;

/// In-process transport driven by a closure, recording every call it sees.
pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new<F, Fut>(handler: F) -> Arc<Self>
    where
        F: Fn(RecordedCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiResponse, TransportError>> + Send + 'static,
    {
        Arc::new(ScriptedTransport {
            handler: Arc::new(move |call| handler(call).boxed()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let call = RecordedCall {
            method: request.method.clone(),
            path: request
                .url
                .strip_prefix(BACKEND_URL)
                .unwrap_or(&request.url)
                .to_string(),
            bearer: request.bearer_token().map(str::to_string),
        };
        self.calls.lock().unwrap().push(call.clone());
        (self.handler)(call).await
    }
}
