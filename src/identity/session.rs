//! Signed, time-limited session tokens carrying the identity claim.
//! Tokens are stateless bearer credentials: nothing is stored server-side and
//! there is no revocation list, they simply expire an hour after issuance.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Identity;

const SESSION_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session token supplied")]
    Missing,
    /// Bad signature, malformed token, or past expiry. Callers are not told
    /// which; all three map to the same forbidden outcome at the boundary.
    #[error("session token invalid or expired")]
    Invalid,
    #[error("failed to sign session token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    name: String,
    email: String,
    picture: String,
    iat: i64,
    exp: i64,
}

/// HS256 codec over the process-wide signing secret, fixed at startup.
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(SESSION_TTL_SECS),
        }
    }

    /// Sign a token embedding the identity, expiring `ttl` from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = SessionClaims {
            name: identity.name.clone(),
            email: identity.email.clone(),
            picture: identity.picture.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, recovering the embedded identity.
    pub fn validate(&self, token: &str) -> Result<Identity, SessionError> {
        if token.is_empty() {
            return Err(SessionError::Missing);
        }
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|_| SessionError::Invalid)?;
        Ok(Identity {
            name: data.claims.name,
            email: data.claims.email,
            picture: data.claims.picture,
        })
    }
}
