//! Repository for the `tasks` table.

use crewline_core::pagination::PageRequest;
use crewline_core::project::TaskStatus;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::task::{CreateTask, Task, UpdateTask};

const COLUMNS: &str = "id, project_id, assignee_id, title, description, status, due_date, \
    created_by, created_at, updated_at";

pub struct TaskRepo;

impl TaskRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (project_id, assignee_id, title, description, due_date, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.project_id)
            .bind(input.assignee_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.due_date)
            .bind(input.created_by)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_project(
        pool: &PgPool,
        project_id: DbId,
        status: Option<TaskStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Task>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        filter.eq("project_id", BindValue::BigInt(project_id));
        if let Some(status) = status {
            filter.eq("status", BindValue::Text(status.as_str().into()));
        }
        filter
            .fetch_page(pool, COLUMNS, "tasks", "due_date ASC NULLS LAST, id ASC", page)
            .await
    }

    pub async fn list_for_assignee(
        pool: &PgPool,
        assignee_id: DbId,
        status: Option<TaskStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Task>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        filter.eq("assignee_id", BindValue::BigInt(assignee_id));
        if let Some(status) = status {
            filter.eq("status", BindValue::Text(status.as_str().into()));
        }
        filter
            .fetch_page(pool, COLUMNS, "tasks", "due_date ASC NULLS LAST, id ASC", page)
            .await
    }

    pub async fn update(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                assignee_id = COALESCE($2, assignee_id),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                due_date = COALESCE($5, due_date)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(input.assignee_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.due_date)
            .fetch_optional(db)
            .await
    }

    /// Compare-and-set status change. `None` if the status moved on.
    pub async fn set_status(
        db: impl PgExecutor<'_>,
        id: DbId,
        observed: TaskStatus,
        target: TaskStatus,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET status = $3 WHERE id = $1 AND status = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(observed.as_str())
            .bind(target.as_str())
            .fetch_optional(db)
            .await
    }

    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
