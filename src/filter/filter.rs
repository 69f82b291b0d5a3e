use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ColumnDef, FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    columns: &'static [ColumnDef],
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>, columns: &'static [ColumnDef]) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            columns,
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData, max_limit: i64) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit, data.offset, max_limit)?;
        } else if let Some(offset) = data.offset {
            self.limit(max_limit, Some(offset), max_limit)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        // Render once now so unknown columns, operators and bad values are the caller's error
        FilterWhere::generate(&conditions, self.columns, 0)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec, self.columns)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>, max_limit: i64) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidPaging("limit must be zero or more".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidPaging("offset must be zero or more".to_string()));
            }
        }

        let applied_limit = if limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn applied_limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn applied_offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match &self.where_data {
            Some(where_data) => FilterWhere::generate(where_data, self.columns, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
            self.table_name, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::ColumnKind;
    use serde_json::json;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("status", ColumnKind::Text),
        ColumnDef::new("created_at", ColumnKind::Timestamp),
    ];

    #[test]
    fn builds_full_select() {
        let mut filter = Filter::new("orders", COLUMNS).unwrap();
        filter
            .assign(
                FilterData {
                    where_clause: Some(json!({ "status": "pending" })),
                    order: Some(json!("created_at desc")),
                    limit: Some(10),
                    offset: Some(20),
                },
                100,
            )
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"orders\" WHERE \"status\" = $1::text ORDER BY \"created_at\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!("pending")]);
    }

    #[test]
    fn caps_limit_and_rejects_negatives() {
        let mut filter = Filter::new("orders", COLUMNS).unwrap();
        filter.limit(5000, None, 100).unwrap();
        assert_eq!(filter.applied_limit(), Some(100));
        assert!(filter.limit(-1, None, 100).is_err());
        assert!(filter.limit(10, Some(-5), 100).is_err());
    }

    #[test]
    fn count_sql_shares_where_clause() {
        let mut filter = Filter::new("orders", COLUMNS).unwrap();
        filter.where_clause(json!({ "status": "pending" })).unwrap();
        let count = filter.to_count_sql().unwrap();
        assert_eq!(count.query, "SELECT COUNT(*) AS count FROM \"orders\" WHERE \"status\" = $1::text");
    }

    #[test]
    fn unknown_columns_fail_on_assignment() {
        let mut filter = Filter::new("orders", COLUMNS).unwrap();
        assert!(matches!(
            filter.where_clause(json!({ "password_hash": "x" })),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            filter.where_clause(json!({ "status": { "$regex": "p.*" } })),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("orders; --", COLUMNS).is_err());
        assert!(Filter::new("", COLUMNS).is_err());
        assert!(Filter::new("order_overview", COLUMNS).is_ok());
    }
}
