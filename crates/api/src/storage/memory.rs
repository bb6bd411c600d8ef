// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// Provides a PostgreSQL-compatible API backed by an in-memory HashMap,
// allowing the API server to run without a database for development.
// All data is lost on restart.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::models::{CreateUserRow, UserRow};
use super::UserStore;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRow>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// Toggle a user's active flag. Dev-mode convenience; the production
    /// store handles deactivation through its own admin tooling.
    pub fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow!("user not found: {}", id))?;
        user.is_active = active;
        user.updated_at = Self::now();
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let needle = email.to_lowercase();
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn create(&self, input: CreateUserRow) -> Result<UserRow> {
        let mut users = self.users.write();

        let needle = input.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == needle) {
            return Err(anyhow!("email already registered: {}", input.email));
        }

        let now = Self::now();
        let id = Uuid::now_v7();
        let row = UserRow {
            id,
            email: input.email,
            password_hash: input.password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            is_admin: input.is_admin,
            account_type: input.account_type,
            is_active: input.is_active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, row.clone());
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<UserRow>> {
        let mut rows: Vec<UserRow> = self.users.read().values().cloned().collect();
        rows.sort_by_key(|u| u.created_at);
        Ok(rows)
    }

    async fn record_login(&self, id: Uuid) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow!("user not found: {}", id))?;
        let now = Self::now();
        user.last_login_at = Some(now);
        user.updated_at = now;
        Ok(())
    }
}
