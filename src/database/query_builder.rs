use serde_json::Value;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::filter::error::FilterError;
use crate::filter::{ColumnDef, Filter, FilterData, SqlResult};

/// A validated list query for one table, ready to run
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: &str, columns: &'static [ColumnDef]) -> Result<Self, DatabaseError> {
        let filter = Filter::new(table_name, columns).map_err(internal)?;
        Ok(Self {
            filter,
            _phantom: std::marker::PhantomData,
        })
    }

    /// Apply client-provided filter data. Errors here are the caller's fault,
    /// so they stay `FilterError` rather than being wrapped.
    pub fn filter(mut self, filter_data: FilterData, max_limit: i64) -> Result<Self, FilterError> {
        self.filter.assign(filter_data, max_limit)?;
        Ok(self)
    }

    pub fn limit(&self) -> Option<i64> {
        self.filter.applied_limit()
    }

    pub fn offset(&self) -> i64 {
        self.filter.applied_offset()
    }

    pub async fn fetch_rows(&self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let SqlResult { query, params } = self.filter.to_sql().map_err(internal)?;
        let mut q = sqlx::query_as::<_, T>(&query);
        for p in param_texts(&params) {
            q = q.bind(p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    /// Rows matching the where clause, ignoring paging
    pub async fn fetch_count(&self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let SqlResult { query, params } = self.filter.to_count_sql().map_err(internal)?;
        let mut q = sqlx::query(&query);
        for p in param_texts(&params) {
            q = q.bind(p);
        }
        let row = q.fetch_one(pool).await?;
        Ok(row.try_get("count")?)
    }
}

// Filters are validated on assignment, so a failure while rendering is a bug
fn internal(err: FilterError) -> DatabaseError {
    DatabaseError::QueryError(err.to_string())
}

/// Every filter parameter is sent as text and cast in SQL
fn param_texts(params: &[Value]) -> Vec<Option<String>> {
    params
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_become_text() {
        let texts = param_texts(&[json!("pending"), json!(10), json!(true), Value::Null]);
        assert_eq!(
            texts,
            vec![Some("pending".to_string()), Some("10".to_string()), Some("true".to_string()), None]
        );
    }
}
