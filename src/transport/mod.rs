pub mod base;
pub mod reqwest_transport;

pub use base::{Transport, TransportError};
pub use reqwest_transport::{ReqwestTransport, classify_error};
