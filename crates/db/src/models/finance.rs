//! Finance expenses.

use crewline_core::types::{Date, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceExpense {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub submitted_by: DbId,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub spent_on: Date,
    pub receipt_url: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateFinanceExpense {
    pub project_id: Option<DbId>,
    pub submitted_by: DbId,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub spent_on: Date,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub project_id: Option<DbId>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}
