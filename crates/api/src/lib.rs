// Veridian API server library
// Decision: Router assembly lives here so binaries and tests share it.

// API routes and types
pub mod api;

// Authentication subsystem
pub mod auth;

// Storage layer
pub mod storage;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::middleware::AuthState;
use auth::socket::ChatState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::routes::login,
        auth::routes::me,
        auth::routes::refresh,
        auth::routes::logout,
        api::users::list_users,
        api::users::get_user,
    ),
    components(
        schemas(
            auth::routes::LoginRequest,
            auth::routes::SessionResponse,
            auth::routes::MeResponse,
            auth::routes::LogoutResponse,
            auth::routes::UserInfo,
            auth::error::AuthErrorBody,
            storage::AccountType,
            api::common::ErrorResponse,
            api::common::ListResponse<auth::routes::UserInfo>,
        )
    ),
    tags(
        (name = "auth", description = "Authentication and session lifecycle"),
        (name = "users", description = "User administration endpoints")
    ),
    info(
        title = "Veridian API",
        version = "0.1.0",
        description = "REST backend for the Veridian web banking demo",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

/// Build the full application router.
pub fn router(auth_state: AuthState) -> Router {
    let users_state = api::users::UsersState {
        store: auth_state.store.clone(),
        auth: auth_state.clone(),
    };
    let chat_state = ChatState::new(auth_state.clone());

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes::routes(auth_state))
        .merge(api::users::routes(users_state))
        .merge(auth::socket::routes(chat_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
