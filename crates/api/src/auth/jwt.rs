// JWT token service for authentication
// Decision: HS256 with two disjoint secrets, one per token class. A refresh
// token can never pass access verification and vice versa.
// Decision: Access tokens are stateless; nothing is persisted server-side.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::AuthError;
use crate::storage::{AccountType, UserRow};

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Identity claims carried by an access token.
///
/// A read-only snapshot taken at issuance; verified requests do not re-fetch
/// the user, so staleness is bounded by the access token lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub account_type: AccountType,
    /// Token class, always "access"
    pub token_type: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims carried by a refresh token: only the subject. Authorization
/// attributes are re-derived from the store when the token is redeemed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Token class, always "refresh"
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed token together with its expiry instant.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token issuance and verification. Keys are built once at startup and
/// shared read-only across requests.
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_ttl.as_secs() as i64),
            refresh_ttl: Duration::seconds(config.refresh_ttl.as_secs() as i64),
        }
    }

    /// Issue an access token carrying an identity snapshot of `user`.
    pub fn issue_access(&self, user: &UserRow) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;

        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_admin: user.is_admin,
            account_type: user.account_type,
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("failed to encode access token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Issue a refresh token for `sub`. Persistent logins get the full
    /// refresh lifetime; others expire with the access window.
    pub fn issue_refresh(&self, sub: Uuid, persistent: bool) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let ttl = if persistent {
            self.refresh_ttl
        } else {
            self.access_ttl
        };
        let expires_at = now + ttl;

        let claims = RefreshClaims {
            sub,
            token_type: TOKEN_TYPE_REFRESH.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.refresh_encoding).map_err(|e| {
            AuthError::Internal(anyhow::anyhow!("failed to encode refresh token: {e}"))
        })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate and decode an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &validation())
            .map_err(classify_decode_error)?;

        if data.claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }

    /// Validate and decode a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())
            .map_err(classify_decode_error)?;

        if data.claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // No grace window: a just-expired token is rejected deterministically.
    validation.leeway = 0;
    validation
}

/// Expiry is the one failure the caller treats differently (prompt a refresh
/// rather than a re-login). Everything else (bad signature, wrong secret
/// class, structural garbage, nonconforming payload) is one bucket.
fn classify_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    }
}
