//! PKCE challenge generation for the Authorization Code flow.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, thread_rng};
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 64;

/// S256 code verifier/challenge pair for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkceChallenge {
    pub fn new() -> Self {
        let code_verifier = Self::random_verifier();
        let code_challenge = Self::challenge_for(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
        }
    }

    pub fn method(&self) -> &'static str {
        "S256"
    }

    fn random_verifier() -> String {
        let mut rng = thread_rng();
        let bytes: Vec<u8> = (0..VERIFIER_BYTES).map(|_| rng.r#gen::<u8>()).collect();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}
