use serde::Serialize;
use sqlx::{self, postgres::PgRow, FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::error::FilterError;
use crate::filter::{ColumnDef, FilterData};
use crate::middleware::response::Paginated;

/// Errors from list queries: either the client's filter was bad or the database failed
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Read access to one table or view through the filter pipeline
pub struct Repository<T> {
    table_name: &'static str,
    columns: &'static [ColumnDef],
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
{
    pub fn new(table_name: &'static str, columns: &'static [ColumnDef], pool: PgPool) -> Self {
        Self {
            table_name,
            columns,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    fn builder(&self, filter_data: FilterData, max_limit: i64) -> Result<QueryBuilder<T>, ListError> {
        let builder = QueryBuilder::<T>::new(self.table_name, self.columns)?.filter(filter_data, max_limit)?;
        Ok(builder)
    }

    /// One page of rows plus the total matching count
    pub async fn select_page(&self, filter_data: FilterData, max_limit: i64) -> Result<Paginated<T>, ListError> {
        let filter_data = FilterData {
            limit: Some(filter_data.limit.unwrap_or(max_limit)),
            ..filter_data
        };
        let builder = self.builder(filter_data.clone(), max_limit)?;
        let items = builder.fetch_rows(&self.pool).await?;
        let unpaged = FilterData { order: None, limit: None, offset: None, ..filter_data };
        let total = self.builder(unpaged, i64::MAX)?.fetch_count(&self.pool).await?;
        Ok(Paginated {
            items,
            total,
            limit: builder.limit().unwrap_or(max_limit),
            offset: builder.offset(),
        })
    }
}
