//! Auth0 error types.

use rsim_session_core::SessionError;
use thiserror::Error;

pub type Auth0Result<T> = Result<T, Auth0Error>;

#[derive(Debug, Error)]
pub enum Auth0Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("State parameter mismatch")]
    StateMismatch,

    #[error("Authorization callback error: {0}")]
    Callback(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("User info request failed: {0}")]
    UserInfo(String),

    #[error("Invalid id_token: {0}")]
    IdToken(#[from] jsonwebtoken::errors::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Credential store error: {0}")]
    Store(String),
}

impl From<Auth0Error> for SessionError {
    fn from(err: Auth0Error) -> Self {
        match err {
            Auth0Error::Store(message) => SessionError::Persistence(message),
            other => SessionError::Authorization(other.to_string()),
        }
    }
}
