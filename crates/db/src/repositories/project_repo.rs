//! Repository for `projects` and its `project_teams` / `project_clients`
//! link tables.

use crewline_core::pagination::PageRequest;
use crewline_core::project::ProjectStatus;
use crewline_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::client::ClientSummary;
use crate::models::project::{
    CreateProject, Project, ProjectClientContact, ProjectDetail, ProjectTeam, TeamLink,
    UpdateProject,
};

const COLUMNS: &str = "id, name, description, status, start_date, due_date, created_by, \
    completed_at, created_at, updated_at";

/// Same columns qualified for queries aliasing `projects p`.
const P_COLUMNS: &str = "p.id, p.name, p.description, p.status, p.start_date, p.due_date, \
    p.created_by, p.completed_at, p.created_at, p.updated_at";

pub struct ProjectRepo;

impl ProjectRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (name, description, start_date, due_date, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.start_date)
            .bind(input.due_date)
            .bind(input.created_by)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Find a project with its linked teams and clients.
    pub async fn find_detail(pool: &PgPool, id: DbId) -> Result<Option<ProjectDetail>, sqlx::Error> {
        let Some(project) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let teams = Self::teams(pool, id).await?;
        let clients = Self::clients(pool, id).await?;
        Ok(Some(ProjectDetail {
            project,
            teams,
            clients,
        }))
    }

    /// One page of projects, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<ProjectStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Project>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter.eq("status", BindValue::Text(status.as_str().into()));
        }
        filter
            .fetch_page(pool, COLUMNS, "projects", "created_at DESC, id DESC", page)
            .await
    }

    /// Projects a client is linked to.
    pub async fn list_for_client(
        pool: &PgPool,
        client_id: DbId,
        page: PageRequest,
    ) -> Result<(Vec<Project>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        filter.eq("pc.client_id", BindValue::BigInt(client_id));
        filter
            .fetch_page(
                pool,
                P_COLUMNS,
                "projects p JOIN project_clients pc ON pc.project_id = p.id",
                "p.created_at DESC, p.id DESC",
                page,
            )
            .await
    }

    pub async fn update(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                start_date = COALESCE($4, start_date),
                due_date = COALESCE($5, due_date)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.start_date)
            .bind(input.due_date)
            .fetch_optional(db)
            .await
    }

    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a project from `observed` to `target`, stamping `completed_at`
    /// when entering `Done` and clearing it when leaving.
    ///
    /// Returns `None` if the status is no longer `observed`.
    pub async fn set_status(
        db: impl PgExecutor<'_>,
        id: DbId,
        observed: ProjectStatus,
        target: ProjectStatus,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                status = $3,
                completed_at = CASE WHEN $3 = 'Done' THEN NOW() ELSE NULL END
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(observed.as_str())
            .bind(target.as_str())
            .fetch_optional(db)
            .await
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Replace the project's team links.
    pub async fn set_teams(
        conn: &mut PgConnection,
        project_id: DbId,
        teams: &[TeamLink],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM project_teams WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *conn)
            .await?;
        for link in teams {
            sqlx::query(
                "INSERT INTO project_teams (project_id, team_id, note) VALUES ($1, $2, $3)
                 ON CONFLICT (project_id, team_id) DO UPDATE SET note = EXCLUDED.note",
            )
            .bind(project_id)
            .bind(link.team_id)
            .bind(&link.note)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Replace the project's client links.
    pub async fn set_clients(
        conn: &mut PgConnection,
        project_id: DbId,
        client_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM project_clients WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *conn)
            .await?;
        if !client_ids.is_empty() {
            sqlx::query(
                "INSERT INTO project_clients (project_id, client_id)
                 SELECT $1, UNNEST($2::BIGINT[])
                 ON CONFLICT DO NOTHING",
            )
            .bind(project_id)
            .bind(client_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn teams(db: impl PgExecutor<'_>, project_id: DbId) -> Result<Vec<ProjectTeam>, sqlx::Error> {
        sqlx::query_as::<_, ProjectTeam>(
            "SELECT t.id AS team_id, t.name, pt.note
             FROM project_teams pt JOIN teams t ON t.id = pt.team_id
             WHERE pt.project_id = $1 ORDER BY t.name",
        )
        .bind(project_id)
        .fetch_all(db)
        .await
    }

    pub async fn clients(db: impl PgExecutor<'_>, project_id: DbId) -> Result<Vec<ClientSummary>, sqlx::Error> {
        sqlx::query_as::<_, ClientSummary>(
            "SELECT c.id, c.company_name, c.contact_name, c.email
             FROM project_clients pc JOIN clients c ON c.id = pc.client_id
             WHERE pc.project_id = $1 ORDER BY c.id",
        )
        .bind(project_id)
        .fetch_all(db)
        .await
    }

    /// Contacts to notify when the project completes.
    pub async fn client_contacts(
        db: impl PgExecutor<'_>,
        project_id: DbId,
    ) -> Result<Vec<ProjectClientContact>, sqlx::Error> {
        sqlx::query_as::<_, ProjectClientContact>(
            "SELECT c.id AS client_id, c.contact_name, c.email
             FROM project_clients pc JOIN clients c ON c.id = pc.client_id
             WHERE pc.project_id = $1 ORDER BY c.id",
        )
        .bind(project_id)
        .fetch_all(db)
        .await
    }

    /// Whether `user_id` is assigned to the project, either through a team
    /// membership scoped to it or a team-wide membership of a linked team.
    pub async fn is_member(
        db: impl PgExecutor<'_>,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM team_members tm
                WHERE tm.user_id = $2
                  AND (tm.project_id = $1
                       OR (tm.project_id IS NULL AND tm.team_id IN
                           (SELECT team_id FROM project_teams WHERE project_id = $1)))
             )",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    /// Whether a client is linked to the project.
    pub async fn has_client(
        db: impl PgExecutor<'_>,
        project_id: DbId,
        client_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM project_clients WHERE project_id = $1 AND client_id = $2)",
        )
        .bind(project_id)
        .bind(client_id)
        .fetch_one(db)
        .await
    }
}
