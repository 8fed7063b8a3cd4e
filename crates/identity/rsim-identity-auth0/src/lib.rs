//! Auth0 identity-provider client.
//!
//! This crate is the real implementation of the two capabilities the session
//! manager consumes: interactive authorization (Authorization Code flow with
//! PKCE against the tenant's hosted login page) and credential persistence
//! (a JSON file under the user config directory). The user-agent interaction
//! itself sits behind the [`LoginSurface`] trait so the flow stays testable
//! and host-independent.

mod authorizer;
mod claims;
mod client;
mod config;
mod error;
mod pkce;
mod store;
mod types;


pub use authorizer::{CallbackParams, LoginSurface, WebAuthorizer};
pub use claims::IdTokenClaims;
pub use client::Auth0Client;
pub use config::Auth0Config;
pub use error::{Auth0Error, Auth0Result};
pub use pkce::PkceChallenge;
pub use store::FileCredentialStore;
pub use types::{TokenResponse, UserInfoResponse};

// Re-export common types for convenience
pub use rsim_session_core::{Credential, CredentialStore, Identity, InteractiveAuthorizer};
