//! Wire types for the token and userinfo endpoints.

use rsim_session_core::Identity;
use serde::{Deserialize, Serialize};

/// Response from the `/oauth/token` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
}

/// Response from the `/userinfo` endpoint (OpenID Connect).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub picture: Option<String>,
}

impl UserInfoResponse {
    pub fn into_identity(self) -> Identity {
        Identity {
            subject: self.sub,
            name: self.name,
            email: self.email,
            picture: self.picture,
        }
    }
}
