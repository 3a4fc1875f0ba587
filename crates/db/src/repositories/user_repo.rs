//! Repository for the `users` table.

use crewline_core::otp::MAX_OTP_ATTEMPTS;
use crewline_core::pagination::PageRequest;
use crewline_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::user::{CreateUser, UpdateUser, User, UserFilter};

/// Column list over `users u JOIN roles r`.
const COLUMNS: &str = "u.id, u.first_name, u.last_name, u.email, u.phone_number, \
    u.password_hash, u.role_id, r.name AS role, r.permissions, u.image_url, \
    u.email_verified, u.otp_hash, u.otp_expires_at, u.otp_attempts, \
    u.failed_login_count, u.locked_until, u.last_login_at, u.created_at, u.updated_at";

const FROM: &str = "users u JOIN roles r ON r.id = u.role_id";

/// Provides CRUD, login bookkeeping and OTP storage for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row with its role resolved.
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                INSERT INTO users (first_name, last_name, email, phone_number, password_hash, role_id, image_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
             )
             SELECT {COLUMNS} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone_number)
            .bind(&input.password_hash)
            .bind(input.role_id)
            .bind(&input.image_url)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE u.id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(
        db: impl PgExecutor<'_>,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE LOWER(u.email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Name of the unique constraint an insert with this email and phone
    /// would violate, checked email first.
    pub async fn conflicting_constraint(
        db: impl PgExecutor<'_>,
        email: &str,
        phone_number: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT CASE
                WHEN EXISTS (SELECT 1 FROM users WHERE email = $1) THEN 'uq_users_email'
                WHEN EXISTS (SELECT 1 FROM users WHERE phone_number = $2) THEN 'uq_users_phone'
             END",
        )
        .bind(email)
        .bind(phone_number)
        .fetch_one(db)
        .await
    }

    /// One page of users, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(role) = &params.role {
            filter.eq("r.name", BindValue::Text(role.clone()));
        }
        if let Some(term) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filter.search(&["u.first_name", "u.last_name", "u.email"], term.trim());
        }
        filter
            .fetch_page(pool, COLUMNS, FROM, "u.created_at DESC, u.id DESC", page)
            .await
    }

    /// Email addresses of every user holding one of `roles`.
    pub async fn emails_with_roles(
        db: impl PgExecutor<'_>,
        roles: &[&str],
    ) -> Result<Vec<String>, sqlx::Error> {
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        sqlx::query_scalar::<_, String>(
            "SELECT u.email FROM users u JOIN roles r ON r.id = u.role_id
             WHERE r.name = ANY($1) ORDER BY u.id",
        )
        .bind(roles)
        .fetch_all(db)
        .await
    }

    /// Update a user. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                UPDATE users SET
                    first_name = COALESCE($2, first_name),
                    last_name = COALESCE($3, last_name),
                    email = COALESCE($4, email),
                    phone_number = COALESCE($5, phone_number),
                    role_id = COALESCE($6, role_id)
                WHERE id = $1
                RETURNING *
             )
             SELECT {COLUMNS} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone_number)
            .bind(input.role_id)
            .fetch_optional(db)
            .await
    }

    pub async fn update_image(
        db: impl PgExecutor<'_>,
        id: DbId,
        image_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET image_url = $2 WHERE id = $1")
            .bind(id)
            .bind(image_url)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete a user. Returns `true` if a row was removed.
    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Login bookkeeping
    // -----------------------------------------------------------------------

    /// Count a failed login and lock the account once `max_failures`
    /// consecutive failures are reached, in one statement.
    ///
    /// A lock that has already expired restarts the count at one, so the
    /// first failure after a lockout does not lock again. Returns the new
    /// count and the lock expiry, if any.
    pub async fn record_failed_login(
        db: impl PgExecutor<'_>,
        id: DbId,
        max_failures: i32,
        lock_minutes: i32,
    ) -> Result<(i32, Option<Timestamp>), sqlx::Error> {
        sqlx::query_as::<_, (i32, Option<Timestamp>)>(
            "WITH cur AS (
                SELECT id,
                       CASE WHEN locked_until IS NOT NULL AND locked_until <= NOW()
                            THEN 1 ELSE failed_login_count + 1 END AS next_count,
                       CASE WHEN locked_until <= NOW() THEN NULL ELSE locked_until END AS live_lock
                FROM users WHERE id = $1
                FOR UPDATE
             )
             UPDATE users u SET
                failed_login_count = cur.next_count,
                locked_until = CASE
                    WHEN cur.next_count >= $2 THEN NOW() + make_interval(mins => $3)
                    ELSE cur.live_lock
                END
             FROM cur
             WHERE u.id = cur.id
             RETURNING u.failed_login_count, u.locked_until",
        )
        .bind(id)
        .bind(max_failures)
        .bind(lock_minutes)
        .fetch_one(db)
        .await
    }

    /// Reset the failure counter, clear any lock and stamp `last_login_at`.
    pub async fn record_successful_login(db: impl PgExecutor<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Update a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        db: impl PgExecutor<'_>,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, failed_login_count = 0, locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // One-time codes
    // -----------------------------------------------------------------------

    /// Store a freshly issued code hash, replacing any previous code and
    /// resetting the attempt counter.
    pub async fn store_otp(
        db: impl PgExecutor<'_>,
        id: DbId,
        otp_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET otp_hash = $2, otp_expires_at = $3, otp_attempts = 0 WHERE id = $1",
        )
        .bind(id)
        .bind(otp_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Count a failed verification. Once the count reaches the attempt limit
    /// the stored code is discarded. Returns the new attempt count.
    pub async fn record_otp_failure(db: impl PgExecutor<'_>, id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE users SET
                otp_attempts = otp_attempts + 1,
                otp_hash = CASE WHEN otp_attempts + 1 >= $2 THEN NULL ELSE otp_hash END,
                otp_expires_at = CASE WHEN otp_attempts + 1 >= $2 THEN NULL ELSE otp_expires_at END
             WHERE id = $1
             RETURNING otp_attempts",
        )
        .bind(id)
        .bind(MAX_OTP_ATTEMPTS)
        .fetch_one(db)
        .await
    }

    /// Clear the stored code only if it is still the one that was verified.
    ///
    /// Returns `false` when another request consumed or replaced it first.
    pub async fn consume_otp(
        db: impl PgExecutor<'_>,
        id: DbId,
        observed_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET otp_hash = NULL, otp_expires_at = NULL, otp_attempts = 0
             WHERE id = $1 AND otp_hash = $2",
        )
        .bind(id)
        .bind(observed_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_email_verified(db: impl PgExecutor<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
