//! Auth0 tenant configuration.

use serde::{Deserialize, Serialize};

/// Scopes requested when none are configured explicitly.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// Configuration for one Auth0 tenant.
///
/// Endpoints are held explicitly so tests can point them at a local mock
/// server; [`Auth0Config::from_domain`] derives the standard tenant layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth0Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub scopes: Vec<String>,
    /// API audience to request, if the app calls a protected API.
    pub audience: Option<String>,
    pub http_timeout_seconds: u64,
}

impl Auth0Config {
    /// Standard endpoint layout for a tenant domain such as
    /// `dev-xxxxx.us.auth0.com`.
    pub fn from_domain(
        domain: impl AsRef<str>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let domain = domain.as_ref().trim_end_matches('/');
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            authorization_endpoint: format!("https://{domain}/authorize"),
            token_endpoint: format!("https://{domain}/oauth/token"),
            userinfo_endpoint: format!("https://{domain}/userinfo"),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            audience: None,
            http_timeout_seconds: 30,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
