//! Core session types and identity-provider capability traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can surface from session operations.
///
/// Absence of a stored credential is not an error; `CredentialStore::load`
/// reports it as `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Interactive authorization failed, was cancelled, or the provider
    /// rejected the exchange. Surfaced to the caller of `login`.
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Saving, loading, or clearing the persisted credential failed.
    /// Best-effort paths log this instead of returning it.
    #[error("Credential persistence failed: {0}")]
    Persistence(String),

    /// A mutating call arrived while another was in flight and the caller
    /// asked for rejection instead of queueing.
    #[error("Another authentication operation is in flight")]
    Busy,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Profile of an authenticated user, keyed by the provider's subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            name: None,
            email: None,
            picture: None,
        }
    }
}

/// Opaque token bundle issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub id_token: Option<String>,
    pub token_type: String,
    /// `None` means the provider issued no expiry and the credential is
    /// treated as long-lived.
    pub expires_at: Option<DateTime<Utc>>,
    pub identity: Identity,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Process start, before the first check has run.
    Unknown,
    /// A check or login is in flight.
    Checking,
    Authenticated,
    Unauthenticated,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Unknown => write!(f, "unknown"),
            SessionStatus::Checking => write!(f, "checking"),
            SessionStatus::Authenticated => write!(f, "authenticated"),
            SessionStatus::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// The application's local view of whether a user is authenticated, and with
/// what identity.
///
/// Constructed only through the methods below, which preserve the invariant
/// that an identity is present exactly when the status is `Authenticated`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    status: SessionStatus,
    identity: Option<Identity>,
}

impl Session {
    pub fn unknown() -> Self {
        Self {
            status: SessionStatus::Unknown,
            identity: None,
        }
    }

    pub fn checking() -> Self {
        Self {
            status: SessionStatus::Checking,
            identity: None,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            identity: Some(identity),
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            identity: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Persistence side of the identity-provider client.
///
/// Implementations own the credential store; the session manager never
/// touches the underlying storage directly and never assumes it is
/// synchronous.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the previously persisted credential, if any.
    async fn load(&self) -> SessionResult<Option<Credential>>;

    async fn save(&self, credential: &Credential) -> SessionResult<()>;

    /// Best-effort removal of the persisted credential.
    async fn clear(&self) -> SessionResult<()>;
}

/// Strategy for the interactive authorization flow.
///
/// Selected at construction time: the real hosted-page flow in a full
/// environment, a simulated one where no login surface exists.
#[async_trait]
pub trait InteractiveAuthorizer: Send + Sync {
    async fn authorize(&self, scopes: &[String]) -> SessionResult<Credential>;
}
