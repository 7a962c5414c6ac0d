use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::models::{User, UserId};
use crate::directory::UserDirectory;
use crate::error::StoreError;

/// Reads the host application's `users` table. Never writes to it.
pub struct PgUserDirectory {
    pool: Arc<PgPool>,
}

impl PgUserDirectory {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn list_by_role(&self, role: &str) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, first_name, role FROM users WHERE role = $1 ORDER BY id",
        )
        .bind(role)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(users)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, first_name, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }
}
