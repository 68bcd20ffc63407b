use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token provided.")]
    MissingToken,
    #[error("Failed to authenticate token.")]
    InvalidToken,
}

/// JWT payload. The subject claim is the user id; the demo token issued by
/// /get-token carries the nil UUID as a placeholder subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Holds the signing and verification keys with the configured TTLs.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub session_ttl: Duration,
    pub demo_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            session_ttl_seconds,
            demo_ttl_seconds,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: Duration::from_secs(session_ttl_seconds.max(0) as u64),
            demo_ttl: Duration::from_secs(demo_ttl_seconds.max(0) as u64),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, subject: Uuid, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            id: subject,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, ttl_seconds = ttl.as_secs(), "jwt signed");
        Ok(token)
    }

    /// Session token handed out on signup/signin.
    pub fn sign_session(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign(user_id, self.session_ttl)
    }

    /// Short-lived anonymous token served by /get-token.
    pub fn sign_demo(&self) -> anyhow::Result<String> {
        self.sign(Uuid::nil(), self.demo_ttl)
    }

    /// Checks signature and expiry. Expiry is exact: no leeway, so a token
    /// is rejected the moment its `exp` passes.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        debug!(subject = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}
