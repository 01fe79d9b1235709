use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::CredentialStore;
use crate::models::Credentials;

/// Persists the token pair as a small JSON document.
///
/// The file is read once on open and mirrored in memory. Each mutation
/// rewrites the file through a temporary sibling and a rename while the write
/// lock is held, so readers never see a half-written pair.
pub struct FileStore {
    path: PathBuf,
    credentials: RwLock<Option<Credentials>>,
}

impl FileStore {
    /// Opens (or lazily creates) the store at `path`. A missing file means logged out.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();
        let credentials = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let parsed: Credentials = serde_json::from_slice(&bytes).map_err(|e| {
                    format!("Failed to parse credential file '{}': {}", path.display(), e)
                })?;
                let normalized = parsed.normalized();
                if normalized.is_none() {
                    warn!(
                        "Credential file '{}' holds a blank access token, treating as logged out",
                        path.display()
                    );
                }
                normalized
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No credential file at '{}' yet.", path.display());
                None
            }
            Err(e) => {
                return Err(format!(
                    "Failed to read credential file '{}': {}",
                    path.display(),
                    e
                ))
            }
        };

        Ok(FileStore {
            path,
            credentials: RwLock::new(credentials),
        })
    }

    async fn persist(&self, credentials: Option<&Credentials>) -> Result<(), String> {
        match credentials {
            Some(credentials) => {
                let encoded = serde_json::to_vec_pretty(credentials)
                    .map_err(|e| format!("Failed to encode credentials: {}", e))?;
                let tmp_path = self.path.with_extension("tmp");
                tokio::fs::write(&tmp_path, encoded)
                    .await
                    .map_err(|e| format!("Failed to write '{}': {}", tmp_path.display(), e))?;
                tokio::fs::rename(&tmp_path, &self.path)
                    .await
                    .map_err(|e| format!("Failed to replace '{}': {}", self.path.display(), e))
            }
            None => match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(format!("Failed to remove '{}': {}", self.path.display(), e)),
            },
        }
    }
}

#[async_trait]
impl CredentialStore for FileStore {
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
        let mut guard = self.credentials.write().await;
        self.persist(Some(&credentials)).await?;
        *guard = Some(credentials);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), String> {
        let mut guard = self.credentials.write().await;
        // In-memory state is dropped even when removing the file fails.
        *guard = None;
        self.persist(None).await
    }

    async fn get_credentials(&self) -> Option<Credentials> {
        self.credentials.read().await.clone()
    }
}
