mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let app = common::spawn_offline_app().await?;

    let res = app.client.get(app.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Med CRM API");
    assert!(body["data"]["endpoints"]["admin"].as_str().unwrap().contains("/admin/orders"));
    Ok(())
}

#[tokio::test]
async fn health_reports_unavailable_database() -> Result<()> {
    let app = common::spawn_offline_app().await?;

    let res = app.client.get(app.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["database"], "unavailable");
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let res = app.client.get(app.url("/nope")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
