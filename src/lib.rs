//! Library exports for authclient, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod events;
pub mod metrics;
pub mod models;
pub mod startup;
pub mod store;
pub mod transport;
pub mod utils;

pub use client::{AuthClient, RefreshState};
pub use events::{SessionEvent, SessionEvents};
pub use models::{ApiRequest, ApiResponse, Credentials};
pub use transport::TransportError;
