pub mod credentials;
pub mod refresh;
pub mod request;

// Re-export so callers can do "use crate::models::{Credentials, ApiRequest};"
pub use credentials::{Credentials, normalize_token, redact_token};
pub use refresh::{RefreshRequest, RefreshResponse};
pub use request::{ApiRequest, ApiResponse};
