//! Simulated authorization for environments without an interactive login
//! surface.
//!
//! Constrained or simulated execution contexts cannot host the provider's
//! login page. There the session manager is constructed with a
//! [`SimulatedAuthorizer`], which fabricates a fixed placeholder identity
//! instead of invoking the real provider. The choice happens at construction
//! time; nothing in the session logic branches on the environment.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rsim_session_core::{
    Credential, CredentialStore, Identity, InteractiveAuthorizer, SessionResult,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Subject assigned to the placeholder identity.
pub const SIMULATED_SUBJECT: &str = "simulated|rocketsim-pilot";

/// Authorizer that always succeeds with a fabricated credential.
#[derive(Clone)]
pub struct SimulatedAuthorizer {
    identity: Identity,
    token_ttl: Duration,
}

impl SimulatedAuthorizer {
    pub fn new() -> Self {
        Self {
            identity: Identity {
                subject: SIMULATED_SUBJECT.to_string(),
                name: Some("Rocketsim Pilot".to_string()),
                email: Some("pilot@rocketsim.example".to_string()),
                picture: None,
            },
            token_ttl: Duration::hours(24),
        }
    }

    /// Override the placeholder identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }
}

impl Default for SimulatedAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractiveAuthorizer for SimulatedAuthorizer {
    async fn authorize(&self, _scopes: &[String]) -> SessionResult<Credential> {
        Ok(Credential {
            access_token: format!("simulated-{}", Uuid::new_v4()),
            id_token: None,
            token_type: "Bearer".to_string(),
            expires_at: Some(Utc::now() + self.token_ttl),
            identity: self.identity.clone(),
        })
    }
}

/// In-memory implementation of [`CredentialStore`].
pub struct MemoryCredentialStore {
    slot: Arc<RwLock<Option<Credential>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Seed the store, as if a previous run had persisted a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(credential))),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> SessionResult<Option<Credential>> {
        let slot = self.slot.read().await;
        Ok(slot.clone())
    }

    async fn save(&self, credential: &Credential) -> SessionResult<()> {
        let mut slot = self.slot.write().await;
        *slot = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        let mut slot = self.slot.write().await;
        *slot = None;
        Ok(())
    }
}
