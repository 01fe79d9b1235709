use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CredentialStore;
use crate::models::Credentials;

/// Keeps credentials in process memory. Writes take the write lock, so they are
/// atomic with respect to concurrent reads.
#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<Option<Credentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// A store that starts out logged in.
    pub fn with_credentials(credentials: Credentials) -> Self {
        MemoryStore {
            credentials: RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_access_token(&self) -> Option<String> {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    async fn get_refresh_token(&self) -> Option<String> {
        self.credentials
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
    }

    async fn set_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), String> {
        let credentials = Credentials::new(access_token, refresh_token)
            .ok_or_else(|| "Refusing to store a blank access token".to_string())?;
        *self.credentials.write().await = Some(credentials);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), String> {
        *self.credentials.write().await = None;
        Ok(())
    }

    async fn get_credentials(&self) -> Option<Credentials> {
        self.credentials.read().await.clone()
    }
}
