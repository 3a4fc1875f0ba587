//! Dynamic `WHERE` clause builder for list endpoints.
//!
//! Every filter value is bound as a parameter; only column names and
//! operators written in repository code are interpolated into SQL.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{FromRow, PgPool, Postgres};

use crewline_core::pagination::PageRequest;
use crewline_core::types::{Date, DbId, Timestamp};

/// A value to bind for a filter condition.
#[derive(Debug, Clone)]
pub enum BindValue {
    BigInt(DbId),
    Text(String),
    Timestamp(Timestamp),
    Date(Date),
}

/// Accumulated conditions and their bind values.
#[derive(Debug, Default)]
pub struct Filter {
    conditions: Vec<String>,
    values: Vec<BindValue>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next bound value will take.
    fn next_idx(&self) -> usize {
        self.values.len() + 1
    }

    /// `expr op $n`.
    pub fn cmp(&mut self, expr: &str, op: &str, value: BindValue) -> &mut Self {
        let idx = self.next_idx();
        self.conditions.push(format!("{expr} {op} ${idx}"));
        self.values.push(value);
        self
    }

    /// `expr = $n`.
    pub fn eq(&mut self, expr: &str, value: BindValue) -> &mut Self {
        self.cmp(expr, "=", value)
    }

    /// Case-insensitive substring match of one term against any of `exprs`.
    pub fn search(&mut self, exprs: &[&str], term: &str) -> &mut Self {
        let idx = self.next_idx();
        let ors: Vec<String> = exprs.iter().map(|e| format!("{e} ILIKE ${idx}")).collect();
        self.conditions.push(format!("({})", ors.join(" OR ")));
        self.values.push(BindValue::Text(format!("%{}%", escape_like(term))));
        self
    }

    /// A condition with no bind value (e.g. a fixed predicate).
    pub fn raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn bind_as<'q, O>(
        &'q self,
        mut q: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for value in &self.values {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
                BindValue::Date(v) => q.bind(*v),
            };
        }
        q
    }

    pub fn bind_scalar<'q>(
        &'q self,
        mut q: QueryScalar<'q, Postgres, i64, PgArguments>,
    ) -> QueryScalar<'q, Postgres, i64, PgArguments> {
        for value in &self.values {
            q = match value {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
                BindValue::Date(v) => q.bind(*v),
            };
        }
        q
    }

    /// Fetch one page of `SELECT {columns} {from} {where} ORDER BY {order}`
    /// together with the total row count for the same filter.
    pub async fn fetch_page<O>(
        &self,
        pool: &PgPool,
        columns: &str,
        from: &str,
        order_by: &str,
        page: PageRequest,
    ) -> Result<(Vec<O>, i64), sqlx::Error>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let where_clause = self.where_clause();
        let limit_idx = self.next_idx();
        let offset_idx = limit_idx + 1;

        let list_query = format!(
            "SELECT {columns} FROM {from} {where_clause} ORDER BY {order_by} \
             LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let items = self
            .bind_as(sqlx::query_as::<_, O>(&list_query))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*)::BIGINT FROM {from} {where_clause}");
        let total = self
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(pool)
            .await?;

        Ok((items, total))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where() {
        assert_eq!(Filter::new().where_clause(), "");
    }

    #[test]
    fn conditions_are_numbered_in_order() {
        let mut f = Filter::new();
        f.eq("status", BindValue::Text("pending".into()))
            .eq("user_id", BindValue::BigInt(4))
            .search(&["title", "description"], "roof");
        assert_eq!(
            f.where_clause(),
            "WHERE status = $1 AND user_id = $2 AND (title ILIKE $3 OR description ILIKE $3)"
        );
        assert_eq!(f.next_idx(), 4);
    }

    #[test]
    fn raw_conditions_take_no_index() {
        let mut f = Filter::new();
        f.raw("approved_at IS NOT NULL").cmp("created_at", ">=", BindValue::BigInt(1));
        assert_eq!(f.where_clause(), "WHERE approved_at IS NOT NULL AND created_at >= $1");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
