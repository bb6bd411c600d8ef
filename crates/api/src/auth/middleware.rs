// Authentication middleware and extractors
// Decision: Support both header-based (API clients) and cookie-based (browser) auth.
// The Authorization header takes precedence; a stale browser cookie must never
// shadow the credential an API client explicitly presented.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use super::config::AuthConfig;
use super::error::AuthError;
use super::jwt::{AccessClaims, TokenService};
use crate::storage::UserStore;

/// Name of the httpOnly cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Name of the httpOnly cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Auth state shared across routes.
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub tokens: Arc<TokenService>,
    pub store: Arc<dyn UserStore>,
}

impl AuthState {
    pub fn new(config: AuthConfig, store: Arc<dyn UserStore>) -> Self {
        let tokens = Arc::new(TokenService::new(&config));
        Self {
            config,
            tokens,
            store,
        }
    }
}

/// Helper trait for extracting AuthState from application state.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl FromRef<AuthState> for AuthState {
    fn from_ref(input: &AuthState) -> Self {
        input.clone()
    }
}

/// Verified identity attached to a request.
///
/// Extraction is side-effect-free: the claims snapshot is trusted as-is and
/// no store lookup happens here. Rejection short-circuits the request before
/// any downstream handler runs.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: AccessClaims,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        extract_session(parts, &auth_state)
    }
}

/// Extract and verify the access token from a request.
///
/// Extraction order: `Authorization: Bearer` header, then the access-token
/// cookie. No token at all is `TokenMissing`; a presented-but-bad token is
/// classified by the verifier and never downgraded to anonymous access.
fn extract_session(parts: &Parts, auth_state: &AuthState) -> Result<AuthSession, AuthError> {
    if let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| AuthError::TokenInvalid)?;

        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            return Err(AuthError::TokenInvalid);
        };

        let claims = auth_state.tokens.verify_access(token)?;
        return Ok(AuthSession { claims });
    }

    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        let claims = auth_state.tokens.verify_access(cookie.value())?;
        return Ok(AuthSession { claims });
    }

    Err(AuthError::TokenMissing)
}
