use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::error::FilterError;
use super::types::{ColumnDef, ColumnKind, FilterOp, FilterWhereInfo};

/// Renders a JSON where clause into SQL with `$n` placeholders.
///
/// Accepted shapes: `{ "col": value }` (equality), `{ "col": { "$op": value } }`,
/// and the logical forms `{ "$and": [..] }`, `{ "$or": [..] }`, `{ "$not": {..} }`.
/// Every parameter is bound as text and cast to the column's type in SQL.
pub struct FilterWhere<'a> {
    columns: &'a [ColumnDef],
    param_values: Vec<Value>,
    param_index: usize,
}

impl<'a> FilterWhere<'a> {
    pub fn new(columns: &'a [ColumnDef], starting_param_index: usize) -> Self {
        Self {
            columns,
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(
        where_data: &Value,
        columns: &'a [ColumnDef],
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(columns, starting_param_index);
        let clause = filter_where.build(where_data)?;
        Ok((clause, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        // Sorted so the SQL text is stable for a given clause
        let mut entries: Vec<_> = obj.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut sql_conditions = vec![];
        for (key, value) in entries {
            if key.starts_with('$') {
                sql_conditions.push(self.logical(key, value)?);
            } else {
                let column = self.column(key)?;
                for condition in Self::field_conditions(column, value)? {
                    sql_conditions.push(self.condition_sql(&condition)?);
                }
            }
        }

        Ok(if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        })
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!("{} requires at least one clause", op)));
                }
                let mut parts = Vec::with_capacity(arr.len());
                for v in arr {
                    parts.push(format!("({})", self.build(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.build(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn column(&self, name: &str) -> Result<ColumnDef, FilterError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .copied()
            .ok_or_else(|| FilterError::InvalidColumn(name.to_string()))
    }

    fn field_conditions(column: ColumnDef, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        match value {
            Value::Object(obj) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Ok(FilterWhereInfo { column, operator, data: op_val.clone() })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterWhereInfo { column, operator: FilterOp::Eq, data: value.clone() }]),
        }
    }

    fn condition_sql(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = condition.column;
        let quoted = format!("\"{}\"", column.name);
        let data = &condition.data;

        let comparison = |op: &str, this: &mut Self| -> Result<String, FilterError> {
            let p = this.param(column, data)?;
            Ok(format!("{} {} {}", quoted, op, p))
        };

        match condition.operator {
            FilterOp::Eq if data.is_null() => Ok(format!("{} IS NULL", quoted)),
            FilterOp::Ne if data.is_null() => Ok(format!("{} IS NOT NULL", quoted)),
            FilterOp::Eq => comparison("=", self),
            FilterOp::Ne => comparison("<>", self),
            FilterOp::Gt => comparison(">", self),
            FilterOp::Gte => comparison(">=", self),
            FilterOp::Lt => comparison("<", self),
            FilterOp::Lte => comparison("<=", self),
            FilterOp::ILike => {
                let pattern = data
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$ilike requires a string".to_string()))?;
                let p = self.push(Value::String(pattern.to_string()), "text");
                Ok(format!("{}::text ILIKE {}", quoted, p))
            }
            FilterOp::In => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in requires an array".to_string()))?;
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let mut params = Vec::with_capacity(values.len());
                for v in values {
                    params.push(self.param(column, v)?);
                }
                Ok(format!("{} IN ({})", quoted, params.join(", ")))
            }
            FilterOp::Between => match data.as_array() {
                Some(values) if values.len() == 2 => {
                    let low = self.param(column, &values[0])?;
                    let high = self.param(column, &values[1])?;
                    Ok(format!("{} BETWEEN {} AND {}", quoted, low, high))
                }
                _ => Err(FilterError::InvalidOperatorData(
                    "$between requires an array with exactly 2 values".to_string(),
                )),
            },
        }
    }

    /// Validate `value` against the column kind and register it as a parameter
    fn param(&mut self, column: ColumnDef, value: &Value) -> Result<String, FilterError> {
        let text = Self::param_text(column, value)?;
        Ok(self.push(Value::String(text), column.kind.cast()))
    }

    fn param_text(column: ColumnDef, value: &Value) -> Result<String, FilterError> {
        let invalid = || {
            FilterError::InvalidOperatorData(format!(
                "value {} is not valid for column '{}'",
                value, column.name
            ))
        };

        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(invalid()),
        };

        let ok = match column.kind {
            ColumnKind::Text => true,
            ColumnKind::Uuid => uuid::Uuid::parse_str(&text).is_ok(),
            ColumnKind::Numeric => Decimal::from_str(&text).is_ok(),
            ColumnKind::Integer => text.parse::<i64>().is_ok(),
            ColumnKind::Boolean => text.parse::<bool>().is_ok(),
            ColumnKind::Timestamp => {
                DateTime::parse_from_rfc3339(&text).is_ok() || NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok()
            }
            ColumnKind::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok(),
        };

        if ok {
            Ok(text)
        } else {
            Err(invalid())
        }
    }

    fn push(&mut self, value: Value, cast: &str) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}::{}", self.param_index, cast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("status", ColumnKind::Text),
        ColumnDef::new("distributor_id", ColumnKind::Uuid),
        ColumnDef::new("total_amount", ColumnKind::Numeric),
        ColumnDef::new("created_at", ColumnKind::Timestamp),
        ColumnDef::new("order_number", ColumnKind::Text),
    ];

    #[test]
    fn implicit_equality_casts_parameter() {
        let (sql, params) = FilterWhere::generate(&json!({ "status": "pending" }), COLUMNS, 0).unwrap();
        assert_eq!(sql, "\"status\" = $1::text");
        assert_eq!(params, vec![json!("pending")]);
    }

    #[test]
    fn operators_and_numbering() {
        let where_data = json!({
            "total_amount": { "$gte": 100 },
            "created_at": { "$between": ["2026-01-01", "2026-02-01T00:00:00Z"] }
        });
        let (sql, params) = FilterWhere::generate(&where_data, COLUMNS, 0).unwrap();
        // Object keys are visited in sorted order
        assert_eq!(
            sql,
            "\"created_at\" BETWEEN $1::timestamptz AND $2::timestamptz AND \"total_amount\" >= $3::numeric"
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params[2], json!("100"));
    }

    #[test]
    fn or_groups_are_parenthesized() {
        let where_data = json!({
            "$or": [
                { "order_number": { "$ilike": "%ORD-2026%" } },
                { "status": { "$in": ["pending", "confirmed"] } }
            ]
        });
        let (sql, params) = FilterWhere::generate(&where_data, COLUMNS, 0).unwrap();
        assert_eq!(
            sql,
            "((\"order_number\"::text ILIKE $1::text) OR (\"status\" IN ($2::text, $3::text)))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = FilterWhere::generate(&json!({ "password_hash": "x" }), COLUMNS, 0).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }

    #[test]
    fn malformed_values_are_rejected_before_sql() {
        let err = FilterWhere::generate(&json!({ "distributor_id": "not-a-uuid" }), COLUMNS, 0).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperatorData(_)));

        let err = FilterWhere::generate(&json!({ "status": { "$regex": ".*" } }), COLUMNS, 0).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
    }

    #[test]
    fn null_equality_uses_is_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "status": null }), COLUMNS, 0).unwrap();
        assert_eq!(sql, "\"status\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, _) = FilterWhere::generate(&json!({ "status": { "$in": [] } }), COLUMNS, 0).unwrap();
        assert_eq!(sql, "1=0");
    }
}
