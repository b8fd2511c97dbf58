//! Request authentication.
//!
//! Two extractors:
//! - [`AuthUser`]: end users, via the Supabase-issued HS256 access token
//!   (`Authorization: Bearer <JWT>`, `aud = "authenticated"`, `sub` = user UUID).
//! - [`CronAuth`]: the external scheduler and backend jobs, via
//!   `Authorization: Bearer <CRON_SECRET>`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use weighin_common::error::AppError;

use crate::state::AppState;

/// Audience Supabase stamps on signed-in user tokens.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// JWT claims carried by a Supabase access token (the subset we use).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user's UUID
    pub sub: String,
    pub aud: String,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

/// Marker extractor: the request carried the cron secret.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

/// Issue a token shaped like a Supabase access token.
pub fn encode_jwt(user_id: Uuid, secret: &str, expiry_hours: u64) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        aud: AUTHENTICATED_AUDIENCE.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
        email: None,
        role: Some(AUTHENTICATED_AUDIENCE.to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("Failed to encode JWT: {}", e)))
}

/// Decode and validate an access token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Length-independent comparison of two secrets.
fn secrets_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    let mut diff = a.len() ^ b.len();
    for (i, byte) in b.iter().enumerate() {
        diff |= (a.get(i).copied().unwrap_or(0) ^ byte) as usize;
    }
    diff == 0
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let secret = state.config.supabase_jwt_secret.as_deref().ok_or_else(|| {
            AppError::Config("SUPABASE_JWT_SECRET is not configured".to_string())
        })?;

        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Auth("Missing or invalid Authorization header. Use 'Bearer <JWT>'".to_string())
        })?;

        let claims = decode_jwt(token, secret)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))?;

        Ok(AuthUser { user_id, claims })
    }
}

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .cron_secret
            .as_deref()
            .ok_or_else(|| AppError::Config("CRON_SECRET is not configured".to_string()))?;

        match bearer_token(parts) {
            Some(given) if secrets_match(given, expected) => Ok(CronAuth),
            _ => Err(AppError::Auth("Invalid cron secret".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn test_encode_decode_jwt() {
        let user_id = Uuid::new_v4();
        let token = encode_jwt(user_id, TEST_SECRET, 24).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.aud, AUTHENTICATED_AUDIENCE);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = encode_jwt(Uuid::new_v4(), TEST_SECRET, 24).unwrap();
        assert!(decode_jwt(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_expired_jwt_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            aud: AUTHENTICATED_AUDIENCE.to_string(),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
            email: None,
            role: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            aud: "anon".to_string(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
            email: None,
            role: Some("anon".to_string()),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_jwt("not.a.valid.jwt", TEST_SECRET).is_err());
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cret", "s3cret!"));
        assert!(!secrets_match("", "s3cret"));
        assert!(!secrets_match("S3cret", "s3cret"));
    }
}
