//! Repository for the `roles` lookup table.

use sqlx::{PgExecutor, PgPool};

use crate::models::role::Role;

const COLUMNS: &str = "id, name, permissions, created_at";

pub struct RoleRepo;

impl RoleRepo {
    pub async fn find_by_name(
        db: impl PgExecutor<'_>,
        name: &str,
    ) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(db)
            .await
    }

    /// List all roles ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles ORDER BY id");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }
}
