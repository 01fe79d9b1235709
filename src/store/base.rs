use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::StoreConfig;
use crate::models::Credentials;

/// The CredentialStore trait abstracts where the access/refresh pair lives.
///
/// Reads happen on every request, writes only on login, refresh and logout.
/// Implementations must make a completed write visible to every later read.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_access_token(&self) -> Option<String>;
    async fn get_refresh_token(&self) -> Option<String>;
    /// Replaces both tokens at once. A blank access token is rejected.
    async fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>)
        -> Result<(), String>;
    async fn clear_all(&self) -> Result<(), String>;

    /// Both tokens from a single snapshot, never a mix of two pairs.
    async fn get_credentials(&self) -> Option<Credentials>;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn CredentialStore>, String> {
    match config {
        StoreConfig::Memory => {
            info!("Using in-memory credential store.");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::File(file_config) => {
            let store = FileStore::open(&file_config.path).await?;
            info!("Using file credential store at '{}'.", file_config.path);
            Ok(Arc::new(store))
        }
    }
}
