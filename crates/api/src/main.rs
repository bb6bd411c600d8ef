// Veridian API server
// Decision: Missing signing secrets abort startup before the listener binds;
// there is no insecure fallback.
// Decision: DATABASE_URL selects Postgres; without it the server runs on the
// in-memory store with seeded demo accounts.

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use veridian_api::auth::{AuthConfig, AuthState};
use veridian_api::storage::{
    password::hash_password, AccountType, CreateUserRow, InMemoryUserStore, PgUserStore, UserStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("veridian_api=debug,tower_http=debug")),
        )
        .init();

    tracing::info!("veridian-api starting...");

    // Fatal when a signing secret is missing
    let auth_config = AuthConfig::from_env()?;
    tracing::info!(
        access_ttl_secs = auth_config.access_ttl.as_secs(),
        refresh_ttl_secs = auth_config.refresh_ttl.as_secs(),
        secure_cookies = auth_config.secure_cookies,
        "Authentication configured"
    );

    // Initialize the user store
    let store: Arc<dyn UserStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgUserStore::connect(&url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory user store (dev mode)");
            let store = InMemoryUserStore::new();
            seed_demo_users(&store).await?;
            Arc::new(store)
        }
    };

    let auth_state = AuthState::new(auth_config, store);
    let app = veridian_api::router(auth_state);

    // CORS only when the dashboard is served from a different origin
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    let app = if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
        app
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
                .allow_credentials(true),
        )
    };

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", addr);

    // Connect-info make-service: the socket authenticator logs remote
    // addresses on refused handshakes
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

/// Seed well-known demo accounts for dev mode. The password defaults to
/// "demo-password" and can be overridden via DEMO_USER_PASSWORD.
async fn seed_demo_users(store: &InMemoryUserStore) -> Result<()> {
    let password =
        std::env::var("DEMO_USER_PASSWORD").unwrap_or_else(|_| "demo-password".to_string());
    let hash = hash_password(&password)?;

    let demo_users = [
        ("avery@veridian.dev", "Avery", "Admin", true, AccountType::Personal),
        ("jordan@veridian.dev", "Jordan", "Rivers", false, AccountType::Personal),
        ("casey@veridian.dev", "Casey", "Mercantile", false, AccountType::Business),
    ];

    for (email, first_name, last_name, is_admin, account_type) in demo_users {
        store
            .create(CreateUserRow {
                email: email.to_string(),
                password_hash: hash.clone(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                is_admin,
                account_type,
                is_active: true,
            })
            .await?;
        tracing::info!(email, is_admin, "seeded demo user");
    }

    Ok(())
}
