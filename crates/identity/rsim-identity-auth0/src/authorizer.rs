//! Interactive authorization against the tenant's hosted login page.

use crate::claims::IdTokenClaims;
use crate::client::Auth0Client;
use crate::error::{Auth0Error, Auth0Result};
use crate::pkce::PkceChallenge;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rsim_session_core::{Credential, InteractiveAuthorizer, SessionResult};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Redirect parameters captured when the provider sends the user agent back.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// The user-agent seam of the authorization flow.
///
/// Given the authorize URL, an implementation presents the hosted login page
/// however the host platform does it (system browser, embedded view) and
/// returns the parameters of the redirect back to the app.
#[async_trait]
pub trait LoginSurface: Send + Sync {
    async fn present(&self, authorize_url: Url) -> Auth0Result<CallbackParams>;
}

/// [`InteractiveAuthorizer`] over the Authorization Code flow with PKCE.
pub struct WebAuthorizer {
    client: Auth0Client,
    surface: Arc<dyn LoginSurface>,
}

impl WebAuthorizer {
    pub fn new(client: Auth0Client, surface: Arc<dyn LoginSurface>) -> Self {
        Self { client, surface }
    }

    fn authorize_url(
        &self,
        scopes: &[String],
        pkce: &PkceChallenge,
        state: &str,
    ) -> Auth0Result<Url> {
        let config = self.client.config();
        let mut url = Url::parse(&config.authorization_endpoint)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &config.client_id);
            params.append_pair("redirect_uri", &config.redirect_uri);
            params.append_pair("state", state);
            if !scopes.is_empty() {
                params.append_pair("scope", &scopes.join(" "));
            }
            params.append_pair("code_challenge", &pkce.code_challenge);
            params.append_pair("code_challenge_method", pkce.method());
            if let Some(audience) = &config.audience {
                params.append_pair("audience", audience);
            }
        }

        Ok(url)
    }

    async fn run_flow(&self, scopes: &[String]) -> Auth0Result<Credential> {
        let pkce = PkceChallenge::new();
        let state = Uuid::new_v4().to_string();
        let url = self.authorize_url(scopes, &pkce, &state)?;

        debug!("Presenting hosted login page");
        let callback = self.surface.present(url).await?;

        if let Some(error) = &callback.error {
            let description = callback.error_description.as_deref().unwrap_or("No description");
            return Err(Auth0Error::Callback(format!("{error}: {description}")));
        }
        if callback.state != state {
            return Err(Auth0Error::StateMismatch);
        }

        let token = self.client.exchange_code(&callback.code, &pkce.code_verifier).await?;

        // Prefer the id_token claims; fall back to a userinfo round trip for
        // opaque-token configurations.
        let identity = match token.id_token.as_deref() {
            Some(raw) => IdTokenClaims::decode(raw)?.into_identity(),
            None => self.client.user_info(&token.access_token).await?.into_identity(),
        };

        info!(subject = %identity.subject, "interactive authorization succeeded");

        Ok(Credential {
            access_token: token.access_token,
            id_token: token.id_token,
            token_type: token.token_type,
            expires_at: token
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds as i64)),
            identity,
        })
    }
}

#[async_trait]
impl InteractiveAuthorizer for WebAuthorizer {
    async fn authorize(&self, scopes: &[String]) -> SessionResult<Credential> {
        self.run_flow(scopes).await.map_err(Into::into)
    }
}
