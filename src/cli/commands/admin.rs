use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::models::Role;
use crate::validation::{normalize_email, FieldErrors};

/// Read when `--password` is not given, so passwords stay out of shell history
pub const ADMIN_PASSWORD_ENV: &str = "MEDCRM_ADMIN_PASSWORD";

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Create an admin user")]
    Create {
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Password (defaults to $MEDCRM_ADMIN_PASSWORD)")]
        password: Option<String>,
    },
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Create { email, name, password } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var(ADMIN_PASSWORD_ENV)
                    .with_context(|| format!("pass --password or set {}", ADMIN_PASSWORD_ENV))?,
            };

            let mut errors = FieldErrors::new("Invalid admin account");
            errors.email("email", &email);
            errors.required_text("name", &name, 200);
            errors.into_result()?;
            validate_password_strength(&password)?;

            let hash = hash_password(&password, config().security.password_iterations)?;
            let email = normalize_email(&email);
            let id = Uuid::new_v4();

            let pool = connect().await?;
            sqlx::query("INSERT INTO users (id, email, name, password_hash, role) VALUES ($1, $2, $3, $4, $5)")
                .bind(id)
                .bind(&email)
                .bind(name.trim())
                .bind(&hash)
                .bind(Role::Admin)
                .execute(&pool)
                .await
                .map_err(crate::database::DatabaseError::from)?;

            output_success(
                output_format,
                &format!("Created admin {}", email),
                Some(json!({ "id": id, "email": email })),
            )
        }
    }
}
