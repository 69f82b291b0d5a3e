use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::database::models::{ActivityAction, DistributorProfile, Role};
use crate::database::Repository;
use crate::filter::{ColumnDef, ColumnKind, FilterData};
use crate::middleware::response::Paginated;
use crate::middleware::AuthUser;
use crate::validation::{non_blank, normalize_email, FieldErrors};

use super::activity_service::{ActivityService, NewActivity};
use super::auth_service::revoke_all_for_user;
use super::product_service::with_default_order;
use super::{ServiceError, ServiceResult};

pub const DISTRIBUTOR_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnKind::Uuid),
    ColumnDef::new("user_id", ColumnKind::Uuid),
    ColumnDef::new("company_name", ColumnKind::Text),
    ColumnDef::new("contact_person", ColumnKind::Text),
    ColumnDef::new("email", ColumnKind::Text),
    ColumnDef::new("phone", ColumnKind::Text),
    ColumnDef::new("gst_number", ColumnKind::Text),
    ColumnDef::new("city", ColumnKind::Text),
    ColumnDef::new("state", ColumnKind::Text),
    ColumnDef::new("is_active", ColumnKind::Boolean),
    ColumnDef::new("credit_limit", ColumnKind::Numeric),
    ColumnDef::new("created_at", ColumnKind::Timestamp),
];

const MAX_NAME_LEN: usize = 200;
const MAX_ADDRESS_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct NewDistributor {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    #[serde(default)]
    pub credit_limit: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributorUpdate {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub credit_limit: Option<Decimal>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Indian GSTIN: 15 upper-case alphanumerics
fn check_gst(errors: &mut FieldErrors, gst: &str) {
    let gst = gst.trim();
    if gst.len() != 15 || !gst.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()) {
        errors.add("gst_number", "must be 15 upper-case letters and digits");
    }
}

fn check_phone(errors: &mut FieldErrors, phone: &str) {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone.chars().all(|c| c.is_ascii_digit() || " +-()".contains(c));
    if phone.trim().is_empty() {
        errors.add("phone", "is required");
    } else if !allowed || !(7..=15).contains(&digits) {
        errors.add("phone", "must be a phone number of 7 to 15 digits");
    }
}

fn check_pincode(errors: &mut FieldErrors, pincode: &str) {
    let pincode = pincode.trim();
    if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
        errors.add("pincode", "must be 6 digits");
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if let Err(crate::auth::AuthError::WeakPassword(problem)) = validate_password_strength(password) {
        errors.add("password", problem);
    }
}

impl NewDistributor {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new("Invalid distributor");
        errors.email("email", &self.email);
        check_password(&mut errors, &self.password);
        errors.optional_text("name", self.name.as_deref(), MAX_NAME_LEN);
        errors.required_text("company_name", &self.company_name, MAX_NAME_LEN);
        errors.required_text("contact_person", &self.contact_person, MAX_NAME_LEN);
        check_phone(&mut errors, &self.phone);
        if let Some(gst) = non_blank(self.gst_number.clone()) {
            check_gst(&mut errors, &gst);
        }
        errors.optional_text("address", self.address.as_deref(), MAX_ADDRESS_LEN);
        errors.optional_text("city", self.city.as_deref(), MAX_NAME_LEN);
        errors.optional_text("state", self.state.as_deref(), MAX_NAME_LEN);
        if let Some(pincode) = non_blank(self.pincode.clone()) {
            check_pincode(&mut errors, &pincode);
        }
        errors.money("credit_limit", self.credit_limit, true);
        errors.into_result()
    }
}

impl DistributorUpdate {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new("Invalid distributor");
        if let Some(name) = &self.name {
            errors.required_text("name", name, MAX_NAME_LEN);
        }
        if let Some(company) = &self.company_name {
            errors.required_text("company_name", company, MAX_NAME_LEN);
        }
        if let Some(contact) = &self.contact_person {
            errors.required_text("contact_person", contact, MAX_NAME_LEN);
        }
        if let Some(phone) = &self.phone {
            check_phone(&mut errors, phone);
        }
        if let Some(gst) = non_blank(self.gst_number.clone()) {
            check_gst(&mut errors, &gst);
        }
        errors.optional_text("address", self.address.as_deref(), MAX_ADDRESS_LEN);
        errors.optional_text("city", self.city.as_deref(), MAX_NAME_LEN);
        errors.optional_text("state", self.state.as_deref(), MAX_NAME_LEN);
        if let Some(pincode) = non_blank(self.pincode.clone()) {
            check_pincode(&mut errors, &pincode);
        }
        if let Some(limit) = self.credit_limit {
            errors.money("credit_limit", limit, true);
        }
        if let Some(password) = &self.password {
            check_password(&mut errors, password);
        }
        errors.into_result()
    }
}

pub struct DistributorService {
    pool: PgPool,
    password_iterations: u32,
}

impl DistributorService {
    pub fn new(pool: PgPool, password_iterations: u32) -> Self {
        Self { pool, password_iterations }
    }

    pub async fn list(&self, filter: FilterData, max_limit: i64) -> ServiceResult<Paginated<DistributorProfile>> {
        let filter = with_default_order(filter, "company_name asc");
        let repo = Repository::<DistributorProfile>::new("distributor_profiles", DISTRIBUTOR_COLUMNS, self.pool.clone());
        Ok(repo.select_page(filter, max_limit).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<DistributorProfile> {
        sqlx::query_as::<_, DistributorProfile>("SELECT * FROM distributor_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Distributor not found".to_string()))
    }

    /// Profile of the signed-in distributor
    pub async fn profile_for_user(&self, user_id: Uuid) -> ServiceResult<DistributorProfile> {
        sqlx::query_as::<_, DistributorProfile>("SELECT * FROM distributor_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Distributor profile not found".to_string()))
    }

    /// Create the login and the distributor profile together
    pub async fn create(&self, actor: AuthUser, input: NewDistributor) -> ServiceResult<DistributorProfile> {
        input.validate()?;
        let password_hash = hash_password(&input.password, self.password_iterations)?;
        let email = normalize_email(&input.email);
        let user_id = Uuid::new_v4();
        let distributor_id = Uuid::new_v4();
        let display_name = non_blank(input.name).unwrap_or_else(|| input.contact_person.trim().to_string());

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (id, email, name, password_hash, role) VALUES ($1, $2, $3, $4, $5)")
            .bind(user_id)
            .bind(&email)
            .bind(&display_name)
            .bind(&password_hash)
            .bind(Role::Distributor)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO distributors (id, user_id, company_name, contact_person, phone, gst_number,
                                      address, city, state, pincode, credit_limit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(distributor_id)
        .bind(user_id)
        .bind(input.company_name.trim())
        .bind(input.contact_person.trim())
        .bind(input.phone.trim())
        .bind(non_blank(input.gst_number))
        .bind(non_blank(input.address))
        .bind(non_blank(input.city))
        .bind(non_blank(input.state))
        .bind(non_blank(input.pincode))
        .bind(input.credit_limit)
        .execute(&mut *tx)
        .await?;

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::DistributorCreated,
                distributor_id,
                format!("Distributor {} created", input.company_name.trim()),
            )
            .with_metadata(json!({ "email": email })),
        )
        .await?;

        let profile = sqlx::query_as::<_, DistributorProfile>("SELECT * FROM distributor_profiles WHERE id = $1")
            .bind(distributor_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Created distributor {} for user {}", distributor_id, user_id);
        Ok(profile)
    }

    pub async fn update(&self, actor: AuthUser, id: Uuid, input: DistributorUpdate) -> ServiceResult<DistributorProfile> {
        input.validate()?;
        let password_hash = match &input.password {
            Some(password) => Some(hash_password(password, self.password_iterations)?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            UPDATE distributors SET
                company_name = COALESCE($2, company_name),
                contact_person = COALESCE($3, contact_person),
                phone = COALESCE($4, phone),
                gst_number = COALESCE($5, gst_number),
                address = COALESCE($6, address),
                city = COALESCE($7, city),
                state = COALESCE($8, state),
                pincode = COALESCE($9, pincode),
                credit_limit = COALESCE($10, credit_limit),
                updated_at = now()
            WHERE id = $1
            RETURNING user_id
            "#,
        )
        .bind(id)
        .bind(input.company_name.as_deref().map(str::trim))
        .bind(input.contact_person.as_deref().map(str::trim))
        .bind(input.phone.as_deref().map(str::trim))
        .bind(non_blank(input.gst_number.clone()))
        .bind(input.address.as_deref().map(str::trim))
        .bind(input.city.as_deref().map(str::trim))
        .bind(input.state.as_deref().map(str::trim))
        .bind(non_blank(input.pincode.clone()))
        .bind(input.credit_limit)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Distributor not found".to_string()))?;

        sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                password_hash = COALESCE($4, password_hash),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.is_active)
        .bind(password_hash.as_deref())
        .execute(&mut *tx)
        .await?;

        // Disabling or resetting the password ends every open session
        if input.is_active == Some(false) || input.password.is_some() {
            let revoked = revoke_all_for_user(&mut tx, user_id).await?;
            tracing::info!("Revoked {} sessions of distributor user {}", revoked, user_id);
        }

        let mut changed: Vec<&str> = Vec::new();
        if input.is_active.is_some() {
            changed.push("is_active");
        }
        if input.password.is_some() {
            changed.push("password");
        }
        ActivityService::record(
            &mut tx,
            NewActivity::new(actor, ActivityAction::DistributorUpdated, id, "Distributor updated")
                .with_metadata(json!({ "is_active": input.is_active, "changed": changed })),
        )
        .await?;

        let profile = sqlx::query_as::<_, DistributorProfile>("SELECT * FROM distributor_profiles WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(profile)
    }

    /// Remove the distributor and its login. Refused once orders exist.
    pub async fn delete(&self, actor: AuthUser, id: Uuid) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        let profile = sqlx::query_as::<_, DistributorProfile>(
            "SELECT * FROM distributor_profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Distributor not found".to_string()))?;

        let has_orders: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE distributor_id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if has_orders {
            return Err(ServiceError::Conflict(
                "Distributor has orders and cannot be deleted; deactivate instead".to_string(),
            ));
        }

        // distributors.user_id cascades
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(profile.user_id)
            .execute(&mut *tx)
            .await?;

        ActivityService::record(
            &mut tx,
            NewActivity::new(
                actor,
                ActivityAction::DistributorDeleted,
                id,
                format!("Distributor {} deleted", profile.company_name),
            )
            .with_metadata(json!({ "email": profile.email })),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Deleted distributor {} ({})", id, profile.company_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distributor() -> NewDistributor {
        NewDistributor {
            email: "orders@citypharma.in".to_string(),
            password: "s3cure-pass".to_string(),
            name: None,
            company_name: "City Pharma".to_string(),
            contact_person: "R. Mehta".to_string(),
            phone: "+91 98765 43210".to_string(),
            gst_number: Some("27AAPFU0939F1ZV".to_string()),
            address: None,
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            pincode: Some("411001".to_string()),
            credit_limit: Decimal::new(50_000, 0),
        }
    }

    #[test]
    fn valid_distributor_passes() {
        assert!(distributor().validate().is_ok());
    }

    #[test]
    fn credit_limit_must_fit_the_column() {
        let input = NewDistributor { credit_limit: Decimal::new(1_000_000_000_000, 0), ..distributor() };
        let errors = input.validate().unwrap_err();
        assert!(errors.contains("credit_limit"));
    }

    #[test]
    fn blank_optional_fields_are_ignored() {
        let input = NewDistributor {
            gst_number: Some("  ".to_string()),
            pincode: Some(String::new()),
            ..distributor()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn collects_field_errors() {
        let input = NewDistributor {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            phone: "call me".to_string(),
            gst_number: Some("27aapfu0939f1zv".to_string()),
            pincode: Some("4110".to_string()),
            ..distributor()
        };
        let errors = input.validate().unwrap_err();
        for field in ["email", "password", "phone", "gst_number", "pincode"] {
            assert!(errors.contains(field), "missing error for {}", field);
        }
    }

    #[test]
    fn update_checks_password_reset() {
        let update = DistributorUpdate {
            password: Some("1234".to_string()),
            ..Default::default()
        };
        assert!(update.validate().unwrap_err().contains("password"));
        assert!(DistributorUpdate {
            is_active: Some(false),
            ..Default::default()
        }
        .validate()
        .is_ok());
    }
}
