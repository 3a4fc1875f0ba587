//! Repository for `finance_expenses`.

use crewline_core::pagination::PageRequest;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::finance::{CreateFinanceExpense, ExpenseFilter, FinanceExpense};

const COLUMNS: &str = "id, project_id, submitted_by, description, amount, currency, spent_on, \
    receipt_url, created_at";

pub struct FinanceExpenseRepo;

impl FinanceExpenseRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &CreateFinanceExpense,
    ) -> Result<FinanceExpense, sqlx::Error> {
        let query = format!(
            "INSERT INTO finance_expenses
                (project_id, submitted_by, description, amount, currency, spent_on, receipt_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FinanceExpense>(&query)
            .bind(input.project_id)
            .bind(input.submitted_by)
            .bind(&input.description)
            .bind(input.amount)
            .bind(&input.currency)
            .bind(input.spent_on)
            .bind(&input.receipt_url)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<FinanceExpense>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM finance_expenses WHERE id = $1");
        sqlx::query_as::<_, FinanceExpense>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &ExpenseFilter,
        page: PageRequest,
    ) -> Result<(Vec<FinanceExpense>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(project_id) = params.project_id {
            filter.eq("project_id", BindValue::BigInt(project_id));
        }
        if let Some(from) = params.from {
            filter.cmp("spent_on", ">=", BindValue::Date(from));
        }
        if let Some(to) = params.to {
            filter.cmp("spent_on", "<=", BindValue::Date(to));
        }
        filter
            .fetch_page(pool, COLUMNS, "finance_expenses", "spent_on DESC, id DESC", page)
            .await
    }

    /// Sum of amounts matching the filter, per currency.
    pub async fn totals(
        pool: &PgPool,
        params: &ExpenseFilter,
    ) -> Result<Vec<(String, f64)>, sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(project_id) = params.project_id {
            filter.eq("project_id", BindValue::BigInt(project_id));
        }
        if let Some(from) = params.from {
            filter.cmp("spent_on", ">=", BindValue::Date(from));
        }
        if let Some(to) = params.to {
            filter.cmp("spent_on", "<=", BindValue::Date(to));
        }
        let query = format!(
            "SELECT currency, SUM(amount)::DOUBLE PRECISION FROM finance_expenses {}
             GROUP BY currency ORDER BY currency",
            filter.where_clause()
        );
        filter
            .bind_as(sqlx::query_as::<_, (String, f64)>(&query))
            .fetch_all(pool)
            .await
    }

    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM finance_expenses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
