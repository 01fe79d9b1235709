//! Metrics collection and exposition for Prometheus.
//!
//! This module provides centralized recording of refresh and transport outcomes.

mod recorder;

pub use recorder::{Metrics, MetricsRecorder};
