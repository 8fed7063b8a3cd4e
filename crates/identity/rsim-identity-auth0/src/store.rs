//! File-backed credential persistence.

use crate::error::{Auth0Error, Auth0Result};
use async_trait::async_trait;
use rsim_session_core::{Credential, CredentialStore, SessionError, SessionResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores the credential as a JSON file, by default under the user config
/// directory. The session manager treats every failure here as recoverable,
/// so a corrupt or unreadable file costs at most a re-login.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/<app>/credentials.json` (platform equivalent).
    pub fn in_config_dir(app: &str) -> Auth0Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Auth0Error::Store("Could not find config directory".to_string()))?;
        Ok(Self::new(config_dir.join(app).join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> SessionResult<Option<Credential>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SessionError::Persistence(err.to_string())),
        };

        let credential: Credential = serde_json::from_str(&data)
            .map_err(|err| SessionError::Persistence(err.to_string()))?;
        debug!(subject = %credential.identity.subject, "loaded stored credential");
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| SessionError::Persistence(err.to_string()))?;
        }

        let data = serde_json::to_string_pretty(credential)
            .map_err(|err| SessionError::Persistence(err.to_string()))?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|err| SessionError::Persistence(err.to_string()))?;
        debug!("credential saved");
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("credential cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionError::Persistence(err.to_string())),
        }
    }
}
