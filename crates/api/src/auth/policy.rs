// Authorization policies evaluated after successful authentication
// Decision: Admin is a superset capability: it bypasses ownership and
// account-type gates rather than taking a separate code path.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::error::AuthError;
use super::jwt::AccessClaims;
use super::middleware::{AuthSession, AuthState, FromRef};
use crate::storage::AccountType;

/// A single authorization gate over verified identity claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Requires `is_admin`.
    AdminOnly,
    /// Requires the subject to own the resource; admins bypass.
    Owner(Uuid),
    /// Requires a business account; admins bypass.
    BusinessOnly,
}

impl Policy {
    pub fn check(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        let allowed = match self {
            Policy::AdminOnly => claims.is_admin,
            Policy::Owner(owner) => claims.is_admin || claims.sub == *owner,
            Policy::BusinessOnly => {
                claims.is_admin || claims.account_type == AccountType::Business
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Apply `policies` in order, stopping at the first failing gate.
///
/// Denials are audit-logged with the acting identity and the resource;
/// a security-relevant record, not debug noise.
pub fn enforce(
    policies: &[Policy],
    claims: &AccessClaims,
    resource: &str,
) -> Result<(), AuthError> {
    for policy in policies {
        if let Err(err) = policy.check(claims) {
            tracing::warn!(
                subject = %claims.sub,
                email = %claims.email,
                resource,
                policy = ?policy,
                "authorization denied"
            );
            return Err(err);
        }
    }
    Ok(())
}

/// Require admin extractor: composes authentication with the admin gate.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthSession);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        enforce(&[Policy::AdminOnly], &session.claims, parts.uri.path())?;
        Ok(AdminUser(session))
    }
}
