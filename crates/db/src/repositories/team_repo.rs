//! Repository for `teams` and `team_members`.

use crewline_core::pagination::PageRequest;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::Filter;
use crate::models::team::{AddTeamMember, CreateTeam, Team, TeamMember, UpdateTeam};

const COLUMNS: &str = "id, name, description, created_at, updated_at";

const MEMBER_COLUMNS: &str = "tm.id, tm.team_id, tm.user_id, tm.project_id, tm.role, tm.note, \
    u.first_name, u.last_name, u.email, tm.created_at";

pub struct TeamRepo;

impl TeamRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateTeam) -> Result<Team, sqlx::Error> {
        let query = format!(
            "INSERT INTO teams (name, description) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Team>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM teams WHERE id = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Team>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            filter.search(&["name"], term.trim());
        }
        filter
            .fetch_page(pool, COLUMNS, "teams", "name ASC, id ASC", page)
            .await
    }

    pub async fn update(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateTeam,
    ) -> Result<Option<Team>, sqlx::Error> {
        let query = format!(
            "UPDATE teams SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(db)
            .await
    }

    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    pub async fn members(db: impl PgExecutor<'_>, team_id: DbId) -> Result<Vec<TeamMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members tm JOIN users u ON u.id = tm.user_id
             WHERE tm.team_id = $1 ORDER BY u.last_name, u.first_name, tm.id"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .fetch_all(db)
            .await
    }

    /// Users of team `team_id` assigned to project `project_id`, including
    /// team-wide members when the team is linked to the project.
    pub async fn members_on_project(
        db: impl PgExecutor<'_>,
        team_id: DbId,
        project_id: DbId,
    ) -> Result<Vec<TeamMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members tm JOIN users u ON u.id = tm.user_id
             WHERE tm.team_id = $1
               AND (tm.project_id = $2
                    OR (tm.project_id IS NULL AND EXISTS
                        (SELECT 1 FROM project_teams pt WHERE pt.team_id = $1 AND pt.project_id = $2)))
             ORDER BY u.last_name, u.first_name, tm.id"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .bind(project_id)
            .fetch_all(db)
            .await
    }

    pub async fn add_member(
        db: impl PgExecutor<'_>,
        team_id: DbId,
        input: &AddTeamMember,
    ) -> Result<TeamMember, sqlx::Error> {
        let query = format!(
            "WITH tm AS (
                INSERT INTO team_members (team_id, user_id, project_id, role, note)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
             )
             SELECT {MEMBER_COLUMNS} FROM tm JOIN users u ON u.id = tm.user_id"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .bind(input.user_id)
            .bind(input.project_id)
            .bind(&input.role)
            .bind(&input.note)
            .fetch_one(db)
            .await
    }

    /// Remove every membership of `user_id` in the team. Returns the number
    /// of rows removed.
    pub async fn remove_member(
        db: impl PgExecutor<'_>,
        team_id: DbId,
        user_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
