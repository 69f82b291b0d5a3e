// handlers/query.rs - Query-string parameters shared by the list endpoints

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::filter::FilterData;

/// Paging and free-form filtering accepted by every list endpoint.
///
/// `where` carries a JSON filter document (`{"status":"pending"}`,
/// `{"total_amount":{"$gte":1000}}`); `order` is `"column [asc|desc], ..."`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order: Option<String>,
    #[serde(rename = "where")]
    pub where_json: Option<String>,
}

impl Paging {
    pub fn into_filter(self, api: &ApiConfig) -> Result<FilterData, ApiError> {
        let where_clause = match self.where_json.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)
                    .map_err(|e| ApiError::bad_request(format!("Invalid 'where' JSON: {}", e)))?;
                if !value.is_object() {
                    return Err(ApiError::bad_request("'where' must be a JSON object"));
                }
                Some(value)
            }
        };
        Ok(FilterData {
            where_clause,
            order: self.order.filter(|o| !o.trim().is_empty()).map(Value::String),
            limit: Some(self.limit.unwrap_or(api.default_page_size)),
            offset: self.offset,
        })
    }
}

/// Collects typed query parameters into a `$and` of conditions
#[derive(Debug, Default)]
pub struct Conditions(Vec<Value>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq<T: ToString>(mut self, column: &str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.0.push(single(column, json!(v.to_string())));
        }
        self
    }

    pub fn flag(mut self, column: &str, value: Option<bool>) -> Self {
        if let Some(v) = value {
            self.0.push(single(column, json!(v)));
        }
        self
    }

    pub fn op(mut self, column: &str, op: &str, value: Option<String>) -> Self {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.0.push(single(column, json!({ op: v })));
        }
        self
    }

    /// Case-insensitive substring match over any of `columns`
    pub fn search(mut self, columns: &[&str], term: Option<String>) -> Self {
        if let Some(term) = term.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(&term));
            let any: Vec<Value> = columns
                .iter()
                .map(|c| single(c, json!({ "$ilike": pattern })))
                .collect();
            self.0.push(json!({ "$or": any }));
        }
        self
    }

    pub fn apply(self, filter: FilterData) -> FilterData {
        match self.0.len() {
            0 => filter,
            1 => filter.and_where(self.0.into_iter().next().unwrap_or(Value::Null)),
            _ => filter.and_where(json!({ "$and": self.0 })),
        }
    }
}

/// Escape LIKE wildcards, and the backslash escape character itself first
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn single(column: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(column.to_string(), value);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Environment};

    fn api() -> ApiConfig {
        AppConfig::preset(Environment::Development).api
    }

    #[test]
    fn search_terms_are_literal() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"C:\path\"), r"C:\\path\\");
        assert_eq!(escape_like(r"\%"), r"\\\%");

        let filter = Conditions::new()
            .search(&["name"], Some(r"amox\".to_string()))
            .apply(FilterData::default());
        assert_eq!(
            filter.where_clause,
            Some(json!({ "$or": [{ "name": { "$ilike": r"%amox\\%" } }] }))
        );
    }

    #[test]
    fn defaults_limit_from_config() {
        let filter = Paging::default().into_filter(&api()).unwrap();
        assert_eq!(filter.limit, Some(api().default_page_size));
        assert!(filter.where_clause.is_none());
        assert!(filter.order.is_none());
    }

    #[test]
    fn parses_where_json() {
        let paging = Paging {
            where_json: Some(r#"{"status":"pending"}"#.to_string()),
            order: Some("created_at desc".to_string()),
            ..Default::default()
        };
        let filter = paging.into_filter(&api()).unwrap();
        assert_eq!(filter.where_clause, Some(json!({"status": "pending"})));
        assert_eq!(filter.order, Some(json!("created_at desc")));
    }

    #[test]
    fn rejects_bad_where() {
        for raw in ["{not json", "[1,2]"] {
            let paging = Paging {
                where_json: Some(raw.to_string()),
                ..Default::default()
            };
            assert!(paging.into_filter(&api()).is_err());
        }
    }

    #[test]
    fn conditions_are_anded() {
        let filter = Conditions::new()
            .eq("status", Some("pending"))
            .flag("is_active", None)
            .op("created_at", "$gte", Some("2026-01-01".to_string()))
            .apply(FilterData::default());
        assert_eq!(
            filter.where_clause,
            Some(json!({"$and": [{"status": "pending"}, {"created_at": {"$gte": "2026-01-01"}}]}))
        );
    }

    #[test]
    fn search_escapes_wildcards() {
        let filter = Conditions::new()
            .search(&["name", "sku"], Some("50%".to_string()))
            .apply(FilterData::default());
        assert_eq!(
            filter.where_clause,
            Some(json!({"$or": [{"name": {"$ilike": "%50\\%%"}}, {"sku": {"$ilike": "%50\\%%"}}]}))
        );
    }
}
