use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;

/// JSON report for a command outcome. Extra object fields are merged at the top level.
fn report(success: bool, message: &str, extra: Option<Value>) -> Value {
    let mut body = Map::new();
    body.insert("success".to_string(), json!(success));
    body.insert(if success { "message" } else { "error" }.to_string(), json!(message));
    if let Some(Value::Object(fields)) = extra {
        body.extend(fields);
    }
    Value::Object(body)
}

pub fn output_success(format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report(true, message, data))?),
        OutputFormat::Text => println!("ok: {}", message),
    }
    Ok(())
}

/// Failures go to stderr in text mode so piped output stays clean
pub fn output_error(format: OutputFormat, message: &str, code: Option<&str>) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let extra = code.map(|c| json!({ "error_code": c }));
            println!("{}", serde_json::to_string_pretty(&report(false, message, extra))?);
        }
        OutputFormat::Text => eprintln!("error: {}", message),
    }
    Ok(())
}

/// Connect with the configured database settings, failing fast
pub async fn connect() -> anyhow::Result<PgPool> {
    let config = config();
    if config.database.url.is_empty() {
        anyhow::bail!("DATABASE_URL is not set");
    }
    Ok(DatabaseManager::connect(&config.database).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_merges_fields() {
        let body = report(true, "Imported 3 products", Some(json!({ "inserted": 2, "updated": 1 })));
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Imported 3 products");
        assert_eq!(body["inserted"], 2);
    }

    #[test]
    fn failures_use_error_key() {
        let body = report(false, "unreachable", Some(json!({ "error_code": "UNREACHABLE" })));
        assert_eq!(body["error"], "unreachable");
        assert!(body.get("message").is_none());
    }
}
