//! Handlers for `/finance/expenses`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::error::CoreError;
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::types::{Date, DbId};
use crewline_core::validation::validate;
use crewline_db::models::finance::{CreateFinanceExpense, ExpenseFilter, FinanceExpense};
use crewline_db::repositories::{FinanceExpenseRepo, ProjectRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseListParams {
    pub project_id: Option<DbId>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub project_id: Option<DbId>,
    #[validate(length(min = 1, max = 500, message = "is required"))]
    pub description: String,
    pub amount: f64,
    pub currency: Option<String>,
    pub spent_on: Date,
    #[validate(url(message = "must be a valid URL"))]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CurrencyTotal {
    pub currency: String,
    pub amount: f64,
}

/// A page of expenses plus per-currency totals over the whole filter.
#[derive(Debug, Serialize)]
pub struct ExpensePage {
    #[serde(flatten)]
    pub page: Page<FinanceExpense>,
    pub totals: Vec<CurrencyTotal>,
}

/// Normalize a currency code to upper case and require three ASCII letters.
fn normalize_currency(raw: Option<&str>) -> Result<String, CoreError> {
    let code = raw.map(str::trim).unwrap_or(DEFAULT_CURRENCY).to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(CoreError::Validation(format!(
            "Invalid currency '{code}'. Expected a 3-letter code"
        )))
    }
}

fn validate_amount(amount: f64) -> Result<(), CoreError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation("amount must be greater than zero".into()))
    }
}

/// GET /api/finance/expenses?projectId=&from=&to=&page=&limit=
pub async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ExpenseListParams>,
) -> AppResult<Json<ExpensePage>> {
    auth.authorize(Action::FinanceView)?;
    let page = PageRequest::new(params.page, params.limit);
    let filter = ExpenseFilter {
        project_id: params.project_id,
        from: params.from,
        to: params.to,
    };
    let (expenses, total) = FinanceExpenseRepo::list(&state.pool, &filter, page).await?;
    let totals = FinanceExpenseRepo::totals(&state.pool, &filter)
        .await?
        .into_iter()
        .map(|(currency, amount)| CurrencyTotal { currency, amount })
        .collect();
    Ok(Json(ExpensePage {
        page: Page::new(expenses, page, total),
        totals,
    }))
}

/// POST /api/finance/expenses
pub async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<CreateExpenseRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<FinanceExpense>>)> {
    auth.authorize(Action::FinanceManage)?;
    validate(&input)?;
    validate_amount(input.amount)?;
    let currency = normalize_currency(input.currency.as_deref())?;
    if let Some(project_id) = input.project_id {
        if ProjectRepo::find_by_id(&state.pool, project_id).await?.is_none() {
            return Err(not_found("Project", project_id));
        }
    }

    let mut tx = state.pool.begin().await?;
    let expense = FinanceExpenseRepo::create(
        &mut *tx,
        &CreateFinanceExpense {
            project_id: input.project_id,
            submitted_by: auth.user_id,
            description: input.description.trim().to_string(),
            amount: input.amount,
            currency,
            spent_on: input.spent_on,
            receipt_url: input.receipt_url,
        },
    )
    .await?;
    AuditEntry::new(actions::CREATE, models::FINANCE_EXPENSE)
        .record(expense.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&expense)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: expense })))
}

/// GET /api/finance/expenses/{id}
pub async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FinanceExpense>>> {
    auth.authorize(Action::FinanceView)?;
    let expense = FinanceExpenseRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("FinanceExpense", id))?;
    Ok(Json(DataResponse { data: expense }))
}

/// DELETE /api/finance/expenses/{id}
pub async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::FinanceManage)?;

    let mut tx = state.pool.begin().await?;
    let before = FinanceExpenseRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("FinanceExpense", id))?;
    if !FinanceExpenseRepo::delete(&mut *tx, id).await? {
        return Err(AppError::concurrent_modification("FinanceExpense"));
    }
    AuditEntry::new(actions::DELETE, models::FINANCE_EXPENSE)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn currency_is_normalized() {
        assert_eq!(normalize_currency(Some(" eur ")).unwrap(), "EUR");
        assert_eq!(normalize_currency(None).unwrap(), DEFAULT_CURRENCY);
        assert_matches!(normalize_currency(Some("EURO")), Err(CoreError::Validation(_)));
        assert_matches!(normalize_currency(Some("U$D")), Err(CoreError::Validation(_)));
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(validate_amount(12.5).is_ok());
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
    }
}
