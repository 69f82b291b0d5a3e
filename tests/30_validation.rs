mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use med_crm::database::models::Role;

// Every request here must be refused before the (unreachable) database is touched.

#[tokio::test]
async fn empty_order_is_rejected() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Distributor);

    let res = app
        .client
        .post(app.url("/distributor/place-order"))
        .bearer_auth(&token)
        .json(&json!({ "items": [], "notes": "rush" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid order");
    assert_eq!(body["field_errors"]["items"], "must contain at least one line");
    Ok(())
}

#[tokio::test]
async fn order_lines_are_checked() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Distributor);
    let product = Uuid::new_v4();

    let res = app
        .client
        .post(app.url("/distributor/place-order"))
        .bearer_auth(&token)
        .json(&json!({
            "items": [
                { "product_id": product, "quantity": 2 },
                { "product_id": product, "quantity": 0 }
            ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert!(body["field_errors"]["items[1].product_id"].is_string());
    assert!(body["field_errors"]["items[1].quantity"].is_string());
    Ok(())
}

#[tokio::test]
async fn payment_mode_fields_are_required() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Distributor);

    let res = app
        .client
        .post(app.url("/distributor/payments"))
        .bearer_auth(&token)
        .json(&json!({
            "order_id": Uuid::new_v4(),
            "amount": "250.00",
            "mode": "bank_transfer",
            "payment_date": "2026-01-15"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["reference_number"].as_str().unwrap().contains("UTR"));
    assert!(body["field_errors"]["bank_name"].is_string());
    Ok(())
}

#[tokio::test]
async fn product_fields_are_validated() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Admin);

    let res = app
        .client
        .post(app.url("/admin/products"))
        .bearer_auth(&token)
        .json(&json!({
            "sku": "has space",
            "name": "Cough syrup",
            "price": "45.555",
            "discount_percent": 150
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    for field in ["sku", "price", "discount_percent"] {
        assert!(body["field_errors"][field].is_string(), "missing {}", field);
    }
    Ok(())
}

#[tokio::test]
async fn rejection_requires_a_note() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Admin);

    let res = app
        .client
        .post(app.url(&format!("/admin/payments/{}/reject", Uuid::new_v4())))
        .bearer_auth(&token)
        .json(&json!({ "note": "  " }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert!(body["field_errors"]["note"].is_string());
    Ok(())
}

#[tokio::test]
async fn list_filters_are_validated() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Admin);

    let cases = [
        ("where", r#"{"password_hash":"x"}"#),
        ("where", r#"{"total_amount":{"$regex":"1"}}"#),
        ("where", "[1,2]"),
        ("order", "password_hash desc"),
        ("limit", "-1"),
    ];
    for (key, value) in cases {
        let res = app
            .client
            .get(app.url("/admin/orders"))
            .bearer_auth(&token)
            .query(&[(key, value)])
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}={}", key, value);
    }
    Ok(())
}

#[tokio::test]
async fn malformed_ids_are_rejected() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Admin);

    let res = app
        .client
        .get(app.url("/admin/orders/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn mistyped_bodies_use_the_error_envelope() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Distributor);

    let res = app
        .client
        .post(app.url("/distributor/payments"))
        .bearer_auth(&token)
        .json(&json!({
            "order_id": Uuid::new_v4(),
            "amount": "10.00",
            "mode": "crypto",
            "payment_date": "2026-01-10"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["mode"].as_str().unwrap().contains("crypto"));

    let res = app
        .client
        .post(app.url("/distributor/place-order"))
        .bearer_auth(&token)
        .json(&json!({ "items": [{ "product_id": "not-a-uuid", "quantity": 1 }] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"].get("items[0].product_id").is_some(), "{}", body);

    let res = app
        .client
        .post(app.url("/distributor/place-order"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{\"items\": [")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field_errors"].as_object().map(|f| f.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn unparsable_query_parameters_use_the_error_envelope() -> Result<()> {
    let app = common::spawn_offline_app().await?;
    let token = app.token(Uuid::new_v4(), Role::Admin);

    let res = app
        .client
        .get(app.url("/admin/orders?limit=ten"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}
