// Storage layer for the Veridian API
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// The auth core depends only on the `UserStore` trait, never on a concrete
// backend. Both implementations enforce the same contract: unique emails,
// case-insensitive email lookup.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod models;
pub mod password;
pub mod postgres;

pub use memory::InMemoryUserStore;
pub use models::{AccountType, CreateUserRow, UserRow};
pub use postgres::PgUserStore;

/// Contract the auth core requires from a credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by email. Matching is case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>>;

    /// Create a user. Fails if the email is already registered
    /// (case-insensitive uniqueness).
    async fn create(&self, input: CreateUserRow) -> Result<UserRow>;

    /// List all users (admin surface).
    async fn list(&self) -> Result<Vec<UserRow>>;

    /// Record a successful login on the user's session metadata.
    async fn record_login(&self, id: Uuid) -> Result<()>;
}
