//! External identity verification against the Google tokeninfo oracle.
//! The oracle is treated as opaque: it either returns a verified claim set or
//! the whole exchange fails. The trait seam lets tests substitute a stub.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verification endpoint for Google-issued ID tokens.
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Normalized identity extracted from a verified external claim set.
/// The email doubles as the principal id recorded in audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub picture: String,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("identity token rejected by issuer")]
    Rejected,
    #[error("token audience does not match the configured client id")]
    AudienceMismatch,
    #[error("issuer unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError>;
}

/// Verifier backed by Google's tokeninfo endpoint, scoped to one OAuth
/// client id. The endpoint is overridable so tests can point it at a local
/// stub server.
pub struct GoogleVerifier {
    client: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_endpoint(client_id, GOOGLE_TOKENINFO_URL)
    }

    pub fn with_endpoint(client_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Claim subset we consume from the tokeninfo response. Google returns more
/// fields; only the audience and the profile claims matter here.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    #[serde(default)]
    name: String,
    email: String,
    #[serde(default)]
    picture: String,
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| VerifyError::Unreachable(e.to_string()))?;

        // tokeninfo answers non-2xx for invalid or expired tokens
        if !resp.status().is_success() {
            return Err(VerifyError::Rejected);
        }

        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| VerifyError::Unreachable(e.to_string()))?;

        if info.aud != self.client_id {
            return Err(VerifyError::AudienceMismatch);
        }

        Ok(Identity {
            name: info.name,
            email: info.email,
            picture: info.picture,
        })
    }
}
