//! Metrics recording implementation using Prometheus.

use prometheus::{
    CounterVec, Encoder, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_int_counter_with_registry,
};
use std::sync::Arc;

/// Trait for recording client-side authentication metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records a 401 and which branch of the refresh state machine handled it.
    fn record_unauthorized(&self, outcome: &str);

    /// Records the outcome of a refresh call ("success", "rejected", "timeout", ...).
    fn record_refresh_attempt(&self, result: &str);

    /// Records how long a refresh call took, whatever its outcome.
    fn record_refresh_duration(&self, duration_secs: f64, result: &str);

    /// Records a terminal logout broadcast.
    fn record_session_expired(&self);

    /// Records a transport-level failure by kind.
    fn record_transport_error(&self, kind: &str);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    unauthorized_total: CounterVec,

    refresh_attempts_total: CounterVec,
    refresh_duration_seconds: HistogramVec,

    session_expired_total: IntCounter,

    transport_errors_total: CounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let unauthorized_total = register_counter_vec_with_registry!(
            Opts::new(
                "auth_client_unauthorized_total",
                "Total number of 401 responses observed, by how the client handled them"
            ),
            &["outcome"],
            registry.clone()
        )
        .expect("Failed to register auth_client_unauthorized_total");

        let refresh_attempts_total = register_counter_vec_with_registry!(
            Opts::new(
                "auth_client_refresh_attempts_total",
                "Total number of refresh endpoint calls, by result"
            ),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register auth_client_refresh_attempts_total");

        let refresh_duration_seconds = register_histogram_vec_with_registry!(
            "auth_client_refresh_duration_seconds",
            "Refresh call duration in seconds",
            &["result"],
            vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0],
            registry.clone()
        )
        .expect("Failed to register auth_client_refresh_duration_seconds");

        let session_expired_total = register_int_counter_with_registry!(
            Opts::new(
                "auth_client_session_expired_total",
                "Total number of session-expired broadcasts"
            ),
            registry.clone()
        )
        .expect("Failed to register auth_client_session_expired_total");

        let transport_errors_total = register_counter_vec_with_registry!(
            Opts::new(
                "auth_client_transport_errors_total",
                "Total number of transport failures, by kind"
            ),
            &["kind"],
            registry.clone()
        )
        .expect("Failed to register auth_client_transport_errors_total");

        Metrics {
            registry,
            unauthorized_total,
            refresh_attempts_total,
            refresh_duration_seconds,
            session_expired_total,
            transport_errors_total,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Number of refresh calls recorded with the given result label.
    pub fn refresh_attempts(&self, result: &str) -> u64 {
        self.refresh_attempts_total
            .with_label_values(&[result])
            .get() as u64
    }

    pub fn session_expirations(&self) -> u64 {
        self.session_expired_total.get()
    }

    pub fn unauthorized(&self, outcome: &str) -> u64 {
        self.unauthorized_total.with_label_values(&[outcome]).get() as u64
    }

    pub fn transport_errors(&self, kind: &str) -> u64 {
        self.transport_errors_total.with_label_values(&[kind]).get() as u64
    }
}

impl MetricsRecorder for Metrics {
    fn record_unauthorized(&self, outcome: &str) {
        self.unauthorized_total.with_label_values(&[outcome]).inc();
    }

    fn record_refresh_attempt(&self, result: &str) {
        self.refresh_attempts_total
            .with_label_values(&[result])
            .inc();
    }

    fn record_refresh_duration(&self, duration_secs: f64, result: &str) {
        self.refresh_duration_seconds
            .with_label_values(&[result])
            .observe(duration_secs);
    }

    fn record_session_expired(&self) {
        self.session_expired_total.inc();
    }

    fn record_transport_error(&self, kind: &str) {
        self.transport_errors_total.with_label_values(&[kind]).inc();
    }
}
