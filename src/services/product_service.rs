use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{ActivityAction, CatalogProduct, Product};
use crate::database::Repository;
use crate::filter::{ColumnDef, ColumnKind, FilterData};
use crate::middleware::response::Paginated;
use crate::middleware::AuthUser;
use crate::validation::{non_blank, FieldErrors};

use super::activity_service::{ActivityService, NewActivity};
use super::{ServiceError, ServiceResult};

pub const PRODUCT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid),
    ColumnDef::new("sku", ColumnKind::Text),
    ColumnDef::new("name", ColumnKind::Text),
    ColumnDef::new("category", ColumnKind::Text),
    ColumnDef::new("unit", ColumnKind::Text),
    ColumnDef::new("price", ColumnKind::Numeric),
    ColumnDef::new("discount_percent", ColumnKind::Numeric),
    ColumnDef::new("stock_quantity", ColumnKind::Integer),
    ColumnDef::new("is_active", ColumnKind::Boolean),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
    ColumnDef::new("updated_at", ColumnKind::Timestamp),
];

const MAX_SKU_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_LABEL_LEN: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new("Invalid product");
        check_sku(&mut errors, &self.sku);
        errors.required_text("name", &self.name, MAX_NAME_LEN);
        errors.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        errors.optional_text("category", self.category.as_deref(), MAX_LABEL_LEN);
        errors.optional_text("unit", self.unit.as_deref(), MAX_LABEL_LEN);
        errors.money("price", self.price, true);
        check_discount(&mut errors, self.discount_percent);
        check_stock(&mut errors, self.stock_quantity);
        errors.into_result()
    }
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new("Invalid product");
        if let Some(sku) = &self.sku {
            check_sku(&mut errors, sku);
        }
        if let Some(name) = &self.name {
            errors.required_text("name", name, MAX_NAME_LEN);
        }
        errors.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        errors.optional_text("category", self.category.as_deref(), MAX_LABEL_LEN);
        if let Some(unit) = &self.unit {
            errors.required_text("unit", unit, MAX_LABEL_LEN);
        }
        if let Some(price) = self.price {
            errors.money("price", price, true);
        }
        if let Some(pct) = self.discount_percent {
            check_discount(&mut errors, pct);
        }
        if let Some(stock) = self.stock_quantity {
            check_stock(&mut errors, stock);
        }
        errors.into_result()
    }

    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.unit.is_none()
            && self.price.is_none()
            && self.discount_percent.is_none()
            && self.stock_quantity.is_none()
            && self.is_active.is_none()
    }
}

fn check_sku(errors: &mut FieldErrors, sku: &str) {
    let sku = sku.trim();
    if sku.is_empty() {
        errors.add("sku", "is required");
    } else if sku.len() > MAX_SKU_LEN {
        errors.add("sku", format!("must be at most {} characters", MAX_SKU_LEN));
    } else if !sku.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        errors.add("sku", "may contain only letters, digits, '-' and '_'");
    }
}

fn check_discount(errors: &mut FieldErrors, pct: Decimal) {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        errors.add("discount_percent", "must be between 0 and 100");
    } else if pct.normalize().scale() > 2 {
        errors.add("discount_percent", "must have at most 2 decimal places");
    }
}

fn check_stock(errors: &mut FieldErrors, stock: i32) {
    if stock < 0 {
        errors.add("stock_quantity", "must be zero or more");
    }
}

pub struct ProductService {
    pool: PgPool,
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repository(&self) -> Repository<Product> {
        Repository::new("products", PRODUCT_COLUMNS, self.pool.clone())
    }

    pub async fn list(&self, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<Product>> {
        let filter = with_default_order(filter, "name asc");
        Ok(self.repository().select_page(filter, max_limit).await?)
    }

    /// Active products only, as distributors see them
    pub async fn catalog(&self, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<CatalogProduct>> {
        let filter = with_default_order(filter, "name asc").and_where(json!({ "is_active": true }));
        let page = self.repository().select_page(filter, max_limit).await?;
        Ok(page.map(CatalogProduct::from))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    pub async fn create(&self, actor: AuthUser, input: NewProduct) -> ServiceResult<Product> {
        input.validate()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, sku, name, description, category, unit, price, discount_percent,
                                  stock_quantity, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(non_blank(input.description))
        .bind(non_blank(input.category))
        .bind(non_blank(input.unit).unwrap_or_else(|| "unit".to_string()))
        .bind(input.price)
        .bind(input.discount_percent)
        .bind(input.stock_quantity)
        .bind(input.is_active)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::ProductCreated,
                product.id,
                format!("Product {} ({}) created", product.name, product.sku),
            ),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Created product {} ({})", product.id, product.sku);
        Ok(product)
    }

    pub async fn update(&self, actor: AuthUser, id: Uuid, input: ProductUpdate) -> ServiceResult<Product> {
        input.validate()?;
        if input.is_empty() {
            return Err(FieldErrors::new("No fields to update").into());
        }

        let mut tx = self.pool.begin().await?;
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                sku = COALESCE($2, sku),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                unit = COALESCE($6, unit),
                price = COALESCE($7, price),
                discount_percent = COALESCE($8, discount_percent),
                stock_quantity = COALESCE($9, stock_quantity),
                is_active = COALESCE($10, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.sku.as_deref().map(str::trim))
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.description.as_deref().map(str::trim))
        .bind(input.category.as_deref().map(str::trim))
        .bind(input.unit.as_deref().map(str::trim))
        .bind(input.price)
        .bind(input.discount_percent)
        .bind(input.stock_quantity)
        .bind(input.is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::ProductUpdated,
                product.id,
                format!("Product {} ({}) updated", product.name, product.sku),
            ),
        )
        .await?;
        tx.commit().await?;

        Ok(product)
    }

    /// Hard delete. Products already on orders are protected by the foreign key.
    pub async fn delete(&self, actor: AuthUser, id: Uuid) -> ServiceResult<Product> {
        let mut tx = self.pool.begin().await?;
        let product = sqlx::query_as::<_, Product>("DELETE FROM products WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::ProductDeleted,
                product.id,
                format!("Product {} ({}) deleted", product.name, product.sku),
            )
            .with_metadata(json!({ "sku": product.sku })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Deleted product {} ({})", product.id, product.sku);
        Ok(product)
    }

    /// Insert or update a product keyed by SKU; returns true when a new row was created
    pub async fn upsert_by_sku(&self, input: &NewProduct) -> ServiceResult<bool> {
        input.validate()?;
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO products (id, sku, name, description, category, unit, price, discount_percent,
                                  stock_quantity, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (sku) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                unit = EXCLUDED.unit,
                price = EXCLUDED.price,
                discount_percent = EXCLUDED.discount_percent,
                stock_quantity = EXCLUDED.stock_quantity,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(non_blank(input.description.clone()))
        .bind(non_blank(input.category.clone()))
        .bind(non_blank(input.unit.clone()).unwrap_or_else(|| "unit".to_string()))
        .bind(input.price)
        .bind(input.discount_percent)
        .bind(input.stock_quantity)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }
}

/// Apply `order` unless the client asked for its own
pub fn with_default_order(mut filter: FilterData, order: &str) -> FilterData {
    if filter.order.is_none() {
        filter.order = Some(json!(order));
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn product() -> NewProduct {
        NewProduct {
            sku: "PARA-500".to_string(),
            name: "Paracetamol 500mg".to_string(),
            description: None,
            category: Some("Analgesics".to_string()),
            unit: Some("strip".to_string()),
            price: Decimal::from_str("24.50").unwrap(),
            discount_percent: Decimal::from_str("5").unwrap(),
            stock_quantity: 100,
            is_active: true,
        }
    }

    #[test]
    fn valid_product_passes() {
        assert!(product().validate().is_ok());
    }

    #[test]
    fn price_must_fit_the_column() {
        let input = NewProduct { price: Decimal::from_str("1000000000000.00").unwrap(), ..product() };
        let errors = input.validate().unwrap_err();
        assert!(errors.contains("price"));
    }

    #[test]
    fn reports_every_bad_field() {
        let input = NewProduct {
            sku: "bad sku!".to_string(),
            name: "   ".to_string(),
            price: Decimal::from_str("-1").unwrap(),
            discount_percent: Decimal::from_str("120").unwrap(),
            stock_quantity: -5,
            ..product()
        };
        let errors = input.validate().unwrap_err();
        for field in ["sku", "name", "price", "discount_percent", "stock_quantity"] {
            assert!(errors.contains(field), "missing error for {}", field);
        }
    }

    #[test]
    fn price_precision_is_limited() {
        let input = NewProduct {
            price: Decimal::from_str("10.999").unwrap(),
            ..product()
        };
        assert_eq!(
            input.validate().unwrap_err().get("price"),
            Some("must have at most 2 decimal places")
        );
    }

    #[test]
    fn update_validates_only_present_fields() {
        let update = ProductUpdate {
            stock_quantity: Some(0),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert!(!update.is_empty());
        assert!(ProductUpdate::default().is_empty());

        let bad = ProductUpdate {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().contains("name"));
    }

    #[test]
    fn default_order_respects_client_choice() {
        let filter = with_default_order(FilterData::default(), "name asc");
        assert_eq!(filter.order, Some(json!("name asc")));

        let custom = FilterData {
            order: Some(json!("price desc")),
            ..Default::default()
        };
        assert_eq!(with_default_order(custom, "name asc").order, Some(json!("price desc")));
    }
}
