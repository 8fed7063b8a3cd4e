//! HTTP client for the tenant's token and userinfo endpoints.

use crate::config::Auth0Config;
use crate::error::{Auth0Error, Auth0Result};
use crate::types::{TokenResponse, UserInfoResponse};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

/// Thin reqwest wrapper around the two provider endpoints this client uses.
#[derive(Clone)]
pub struct Auth0Client {
    http_client: Client,
    config: Auth0Config,
}

impl Auth0Client {
    pub fn new(config: Auth0Config) -> Auth0Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &Auth0Config {
        &self.config
    }

    /// Exchange an authorization code for tokens (PKCE, public client).
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Auth0Result<TokenResponse> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("client_id", self.config.client_id.as_str());
        params.insert("code", code);
        params.insert("code_verifier", code_verifier);
        params.insert("redirect_uri", self.config.redirect_uri.as_str());

        let response = self
            .http_client
            .post(&self.config.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Token exchange failed: {}", error_text);
            return Err(Auth0Error::TokenExchange(error_text));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Auth0Error::TokenExchange(e.to_string()))?;

        debug!("Exchanged authorization code for tokens");
        Ok(token_response)
    }

    /// Fetch the user's profile with an access token.
    pub async fn user_info(&self, access_token: &str) -> Auth0Result<UserInfoResponse> {
        let response = self
            .http_client
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("User info request failed: {}", error_text);
            return Err(Auth0Error::UserInfo(error_text));
        }

        let user_info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| Auth0Error::UserInfo(e.to_string()))?;

        debug!("Retrieved user info for subject: {}", user_info.sub);
        Ok(user_info)
    }
}
