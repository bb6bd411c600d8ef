// Error types for the auth subsystem
//
// Every variant maps to a stable machine-readable code so clients can react
// programmatically (401 "log in again" vs 403 "you lack permission").
// Internal sources are logged server-side and never serialized into bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors surfaced by authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login with unknown email or wrong password
    #[error("invalid email or password")]
    CredentialsInvalid,

    /// The account exists but has been deactivated
    #[error("account is inactive")]
    AccountInactive,

    /// No token was presented at all
    #[error("authentication required")]
    TokenMissing,

    /// Signature valid but the token is past its expiry
    #[error("token expired")]
    TokenExpired,

    /// Bad signature, wrong secret class, or malformed payload
    #[error("invalid token")]
    TokenInvalid,

    /// Authenticated, but an authorization policy denied access
    #[error("insufficient permissions")]
    Forbidden,

    /// Request body is missing required fields
    #[error("email and password are required")]
    MissingFields,

    /// Fatal startup misconfiguration (missing signing secret)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Unexpected failure (store errors, token encoding)
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable code carried in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::CredentialsInvalid => "CREDENTIALS_INVALID",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::TokenMissing => "TOKEN_MISSING",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::MissingFields => "MISSING_FIELDS",
            AuthError::Configuration(_) => "CONFIGURATION_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::CredentialsInvalid
            | AuthError::AccountInactive
            | AuthError::TokenMissing
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::MissingFields => StatusCode::BAD_REQUEST,
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Wire format for auth failures.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthErrorBody {
    /// Stable machine-readable code, e.g. "TOKEN_EXPIRED".
    pub code: String,
    /// Human-readable message.
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // The wrapped source (store failure, encoder error) stays in the log;
        // the body carries only the stable code and message.
        if let AuthError::Internal(ref source) = self {
            tracing::error!("internal auth error: {:#}", source);
        }

        let body = AuthErrorBody {
            code: self.code().to_string(),
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
