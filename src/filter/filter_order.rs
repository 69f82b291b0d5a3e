use serde_json::Value;

use super::error::FilterError;
use super::types::{ColumnDef, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"created_at desc, name"`, `["created_at desc"]` or `{ "created_at": "desc" }`
    pub fn validate_and_parse(order: &Value, columns: &[ColumnDef]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let parsed = match order {
            Value::Null => vec![],
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)),
                        other => {
                            return Err(FilterError::InvalidOperatorData(format!(
                                "order entries must be strings, got {}",
                                other
                            )))
                        }
                    }
                }
                out
            }
            Value::Object(obj) => obj
                .iter()
                .map(|(k, v)| FilterOrderInfo {
                    column: k.clone(),
                    sort: Self::direction(v.as_str().unwrap_or("asc")),
                })
                .collect(),
            _ => {
                return Err(FilterError::InvalidOperatorData(
                    "order must be a string, array or object".to_string(),
                ))
            }
        };

        for info in &parsed {
            if !columns.iter().any(|c| c.name == info.column) {
                return Err(FilterError::InvalidColumn(info.column.clone()));
            }
        }
        Ok(parsed)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let sort = Self::direction(it.next().unwrap_or("asc"));
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        out
    }

    fn direction(raw: &str) -> SortDirection {
        if raw.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::ColumnKind;
    use serde_json::json;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("created_at", ColumnKind::Timestamp),
        ColumnDef::new("name", ColumnKind::Text),
    ];

    #[test]
    fn parses_string_form() {
        let infos = FilterOrder::validate_and_parse(&json!("created_at desc, name"), COLUMNS).unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"created_at\" DESC, \"name\" ASC");
    }

    #[test]
    fn rejects_unknown_sort_column() {
        let err = FilterOrder::validate_and_parse(&json!("1; DROP TABLE users"), COLUMNS).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }
}
