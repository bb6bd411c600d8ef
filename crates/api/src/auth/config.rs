// Authentication configuration loaded from environment variables.
// Decision: A missing signing secret is fatal at startup, never a default.

use std::time::Duration;

use super::error::AuthError;

const DEFAULT_ACCESS_TTL_SECS: u64 = 60 * 60; // 1 hour
const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60; // 7 days

/// Complete authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for signing access tokens.
    pub access_secret: String,
    /// Secret for signing refresh tokens. Disjoint from the access secret so
    /// a leaked refresh secret cannot forge access tokens (or vice versa).
    pub refresh_secret: String,
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime when the login asked to be remembered.
    /// Non-persistent logins fall back to the access lifetime.
    pub refresh_ttl: Duration,
    /// Whether session cookies carry the `Secure` attribute (production).
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// `ACCESS_TOKEN_SECRET` and `REFRESH_TOKEN_SECRET` are required and must
    /// differ; absence of either aborts startup.
    pub fn from_env() -> Result<Self, AuthError> {
        let access_secret = required_secret("ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required_secret("REFRESH_TOKEN_SECRET")?;

        if access_secret == refresh_secret {
            return Err(AuthError::Configuration(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must be distinct".to_string(),
            ));
        }

        let access_ttl = ttl_from_env("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS);
        let refresh_ttl = ttl_from_env("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS);

        let secure_cookies = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
            secure_cookies,
        })
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.as_secs() as i64
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.as_secs() as i64
    }
}

fn required_secret(name: &'static str) -> Result<String, AuthError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::Configuration(format!("{} is not set", name))),
    }
}

fn ttl_from_env(name: &str, default_secs: u64) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default_secs))
}
