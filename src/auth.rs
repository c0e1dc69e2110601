//! Bearer-token authentication.
//!
//! Issues and verifies signed JWTs (HS256) carrying a subject and an
//! absolute expiry. Tokens are stateless: there is no refresh and no
//! revocation list; once the expiry passes the token is dead.
//!
//! Credential checking goes through [`CredentialStore`], a collaborator a
//! real deployment must back with hashed, constant-time-compared secrets.
//! The in-memory implementation here holds demo users only.

use crate::error::{BankError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// JWT claims: subject username and expiry as a unix timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Verifies a username/password pair.
pub trait CredentialStore: Send + Sync {
    /// Returns `true` if the pair matches a known user.
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// In-memory credential store for demo users.
#[derive(Default)]
pub struct MemoryCredentials {
    users: HashMap<String, String>,
}

impl MemoryCredentials {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, builder style.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

impl CredentialStore for MemoryCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|stored| stored == password)
            .unwrap_or(false)
    }
}

/// Issues and verifies session tokens.
pub struct AuthGate {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthGate {
    /// Creates a gate signing with `secret`, issuing tokens valid for
    /// `ttl_minutes` from issuance.
    pub fn new(secret: &str, ttl_minutes: i64, credentials: Arc<dyn CredentialStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is absolute; no clock leeway.
        validation.leeway = 0;

        AuthGate {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::minutes(ttl_minutes),
            credentials,
        }
    }

    /// Authenticates a user and returns a fresh token.
    ///
    /// Fails with `Unauthorized` if the credentials don't match a known
    /// user.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        if !self.credentials.verify(username, password) {
            return Err(BankError::Unauthorized(
                "invalid username or password".to_string(),
            ));
        }

        self.issue(username, Utc::now() + self.ttl)
    }

    fn issue(&self, username: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            exp: expires_at.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verifies a token and returns the username it was issued to.
    ///
    /// Fails with `Unauthorized` if the token is malformed, carries a bad
    /// signature, or has expired.
    pub fn verify(&self, token: &str) -> Result<String> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|err| BankError::Unauthorized(format!("invalid or expired token: {}", err)))
    }
}
