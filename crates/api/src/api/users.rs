// Users API routes
// Decision: Listing is admin-only (member management in the dashboard);
// individual profiles are ownership-gated with the usual admin bypass.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use super::common::{ErrorResponse, ListResponse};
use crate::auth::middleware::{AuthSession, AuthState, FromRef};
use crate::auth::policy::{enforce, AdminUser, Policy};
use crate::auth::routes::UserInfo;
use crate::storage::UserStore;

/// App state for users routes
#[derive(Clone)]
pub struct UsersState {
    pub store: Arc<dyn UserStore>,
    pub auth: AuthState,
}

impl FromRef<UsersState> for AuthState {
    fn from_ref(input: &UsersState) -> Self {
        input.auth.clone()
    }
}

/// Create users routes
pub fn routes(state: UsersState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .with_state(state)
}

/// GET /users - List all users (admin only)
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "List of users", body = ListResponse<UserInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an admin"),
        (status = 500, description = "Internal server error")
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<UsersState>,
    AdminUser(_session): AdminUser,
) -> Result<Json<ListResponse<UserInfo>>, StatusCode> {
    let rows = state.store.list().await.map_err(|e| {
        tracing::error!("Failed to list users: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let users: Vec<UserInfo> = rows.iter().map(UserInfo::from).collect();
    Ok(Json(ListResponse::new(users)))
}

/// GET /users/:id - Fetch one user profile (owner or admin)
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserInfo),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<UsersState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<UserInfo>, Response> {
    enforce(&[Policy::Owner(id)], &session.claims, "/users/:id")
        .map_err(IntoResponse::into_response)?;

    let user = state
        .store
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load user: {:#}", e);
            ErrorResponse::new("failed to load user")
                .into_response(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        })?
        .ok_or_else(|| {
            ErrorResponse::new("user not found")
                .into_response(StatusCode::NOT_FOUND)
                .into_response()
        })?;

    Ok(Json(UserInfo::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::AuthConfig;
    use crate::storage::{
        password::hash_password, AccountType, CreateUserRow, InMemoryUserStore, UserRow,
    };
    use axum::{body::Body, http::header, http::Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::time::Duration as StdDuration;
    use tower::ServiceExt;

    struct TestHarness {
        state: UsersState,
        admin: UserRow,
        jane: UserRow,
        kim: UserRow,
    }

    async fn setup() -> TestHarness {
        let config = AuthConfig {
            access_secret: "users-access-secret".to_string(),
            refresh_secret: "users-refresh-secret".to_string(),
            access_ttl: StdDuration::from_secs(3600),
            refresh_ttl: StdDuration::from_secs(604_800),
            secure_cookies: false,
        };
        let store = Arc::new(InMemoryUserStore::new());
        let hash = hash_password("pw").unwrap();

        let mut users = Vec::new();
        for (email, is_admin) in [
            ("admin@veridian.test", true),
            ("jane@veridian.test", false),
            ("kim@veridian.test", false),
        ] {
            users.push(
                store
                    .create(CreateUserRow {
                        email: email.to_string(),
                        password_hash: hash.clone(),
                        first_name: email.split('@').next().unwrap().to_string(),
                        last_name: "User".to_string(),
                        is_admin,
                        account_type: AccountType::Personal,
                        is_active: true,
                    })
                    .await
                    .unwrap(),
            );
        }
        let kim = users.pop().unwrap();
        let jane = users.pop().unwrap();
        let admin = users.pop().unwrap();

        let auth = AuthState::new(config, store.clone());
        TestHarness {
            state: UsersState { store, auth },
            admin,
            jane,
            kim,
        }
    }

    async fn get_with_token(state: &UsersState, uri: &str, token: Option<&str>) -> (u16, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = routes(state.clone())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn token_for(state: &UsersState, user: &UserRow) -> String {
        state.auth.tokens.issue_access(user).unwrap().token
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let h = setup().await;

        // No token: authentication failure (401)
        let (status, body) = get_with_token(&h.state, "/users", None).await;
        assert_eq!(status, 401);
        assert_eq!(body["code"], "TOKEN_MISSING");

        // Authenticated non-admin: authorization failure (403, distinct)
        let token = token_for(&h.state, &h.jane);
        let (status, body) = get_with_token(&h.state, "/users", Some(&token)).await;
        assert_eq!(status, 403);
        assert_eq!(body["code"], "FORBIDDEN");

        // Admin: full listing
        let token = token_for(&h.state, &h.admin);
        let (status, body) = get_with_token(&h.state, "/users", Some(&token)).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_user_ownership() {
        let h = setup().await;
        let jane_token = token_for(&h.state, &h.jane);

        // Own profile: allowed
        let (status, body) =
            get_with_token(&h.state, &format!("/users/{}", h.jane.id), Some(&jane_token)).await;
        assert_eq!(status, 200);
        assert_eq!(body["email"], "jane@veridian.test");

        // Someone else's profile: denied
        let (status, _) =
            get_with_token(&h.state, &format!("/users/{}", h.kim.id), Some(&jane_token)).await;
        assert_eq!(status, 403);

        // Admin bypasses ownership
        let admin_token = token_for(&h.state, &h.admin);
        let (status, body) =
            get_with_token(&h.state, &format!("/users/{}", h.kim.id), Some(&admin_token)).await;
        assert_eq!(status, 200);
        assert_eq!(body["email"], "kim@veridian.test");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let h = setup().await;
        let admin_token = token_for(&h.state, &h.admin);

        let (status, body) = get_with_token(
            &h.state,
            &format!("/users/{}", Uuid::now_v7()),
            Some(&admin_token),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "user not found");
    }

    #[tokio::test]
    async fn test_listing_never_exposes_password_hash() {
        let h = setup().await;
        let token = token_for(&h.state, &h.admin);
        let (_, body) = get_with_token(&h.state, "/users", Some(&token)).await;
        assert!(!body.to_string().contains("argon2"));
        assert!(!body.to_string().contains("password"));
    }
}
