//! The authenticated client: credential injection, refresh call and the
//! coordinator tying them together.

pub mod coordinator;
pub mod injector;
pub mod refresh;

pub use coordinator::{AuthClient, RefreshState};
pub use injector::{authorize, with_bearer};
pub use refresh::{RefreshCall, RefreshFailure};
