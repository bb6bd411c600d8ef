// Authentication HTTP routes
// Decision: Session tokens travel as httpOnly cookies for the browser
// dashboard; the same access token is also honored as a bearer header for
// API clients. Bodies never echo the tokens.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::AuthError;
use super::jwt::IssuedToken;
use super::middleware::{AuthSession, AuthState, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::storage::{password::verify_password, AccountType, UserRow};

/// Login request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Keep the refresh token alive for 7 days instead of one hour.
    #[serde(default)]
    pub remember_me: bool,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub account_type: AccountType,
}

impl From<&UserRow> for UserInfo {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_admin: user.is_admin,
            account_type: user.account_type,
        }
    }
}

/// Response to a successful login or refresh.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserInfo,
    /// When the freshly minted access token expires.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Create auth routes
pub fn routes(state: AuthState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .with_state(state)
}

/// POST /auth/login - Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookies set", body = SessionResponse),
        (status = 400, description = "Missing email or password", body = super::error::AuthErrorBody),
        (status = 401, description = "Invalid credentials or inactive account", body = super::error::AuthErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AuthError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AuthError::MissingFields);
    }

    // Email lookup is case-insensitive; the store owns that contract
    let user = state
        .store
        .find_by_email(&req.email)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::CredentialsInvalid)?;

    // Argon2 is CPU-bound; keep it off the async workers
    let password = req.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(anyhow::anyhow!(e)))?;

    if !valid {
        return Err(AuthError::CredentialsInvalid);
    }

    // Checked after password verification; a wrong-password probe must not
    // learn whether an account was deactivated
    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    let access = state.tokens.issue_access(&user)?;
    let refresh = state.tokens.issue_refresh(user.id, req.remember_me)?;

    // Session metadata is best-effort; a failed timestamp must not fail login
    if let Err(e) = state.store.record_login(user.id).await {
        tracing::warn!(user_id = %user.id, "failed to record login timestamp: {e:#}");
    }

    tracing::info!(user_id = %user.id, remember_me = req.remember_me, "login succeeded");

    let jar = apply_session_cookies(jar, &state.config, &access, &refresh, req.remember_me);

    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            user: UserInfo::from(&user),
            expires_at: access.expires_at,
        }),
    ))
}

/// GET /auth/me - Current user, re-checked against the store
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing, invalid, or expired token; or account no longer active", body = super::error::AuthErrorBody)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AuthState>,
    session: AuthSession,
) -> Result<Json<MeResponse>, AuthError> {
    // Claims are a snapshot; this endpoint is the place that answers
    // "am I still logged in", so it consults the store for liveness.
    let user = state
        .store
        .find_by_id(session.claims.sub)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenInvalid)?;

    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    Ok(Json(MeResponse {
        user: UserInfo::from(&user),
    }))
}

/// POST /auth/refresh - Mint a new token pair from the refresh cookie
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair; cookies rotated", body = SessionResponse),
        (status = 401, description = "Missing, invalid, or expired refresh token", body = super::error::AuthErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AuthState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), AuthError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::TokenMissing)?;

    let claims = state.tokens.verify_refresh(&token)?;

    // Re-derive identity from a genuine by-id lookup; the refresh token
    // carries nothing but the subject
    let user = state
        .store
        .find_by_id(claims.sub)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::TokenInvalid)?;

    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    // The presented token's own lifetime tells us whether this session was
    // a remember-me login, so persistence survives rotation without extra claims
    let persistent = claims.exp - claims.iat > state.tokens.access_ttl_secs();

    let access = state.tokens.issue_access(&user)?;
    let new_refresh = state.tokens.issue_refresh(user.id, persistent)?;

    let jar = apply_session_cookies(jar, &state.config, &access, &new_refresh, persistent);

    Ok((
        jar,
        Json(SessionResponse {
            success: true,
            user: UserInfo::from(&user),
            expires_at: access.expires_at,
        }),
    ))
}

/// POST /auth/logout - Clear session cookies. Idempotent; succeeds with or
/// without an active session.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));

    (jar, Json(LogoutResponse { success: true }))
}

/// Set both session cookies: httpOnly, SameSite=Strict, path=/, Secure in
/// production. The refresh cookie's max-age tracks the persistence choice.
fn apply_session_cookies(
    jar: CookieJar,
    config: &AuthConfig,
    access: &IssuedToken,
    refresh: &IssuedToken,
    persistent: bool,
) -> CookieJar {
    let access_cookie = Cookie::build((ACCESS_COOKIE, access.token.clone()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(config.access_ttl_secs()))
        .build();

    let refresh_max_age = if persistent {
        config.refresh_ttl_secs()
    } else {
        config.access_ttl_secs()
    };
    let refresh_cookie = Cookie::build((REFRESH_COOKIE, refresh.token.clone()))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(refresh_max_age))
        .build();

    jar.add(access_cookie).add(refresh_cookie)
}
