// HTTP API Error Types
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::filter::error::FilterError;
use crate::services::ServiceError;
use crate::validation::FieldErrors;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<BTreeMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity (well-formed but refused by business rules)
    UnprocessableEntity {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::UnprocessableEntity { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity { .. } => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError { field_errors: Some(field_errors), .. } => {
                body["field_errors"] = json!(field_errors);
            }
            ApiError::UnprocessableEntity { field_errors, .. } => {
                body["field_errors"] = json!(field_errors);
            }
            _ => {}
        }

        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<BTreeMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unprocessable_entity(
        message: impl Into<String>,
        field_errors: BTreeMap<String, String>,
    ) -> Self {
        ApiError::UnprocessableEntity {
            message: message.into(),
            field_errors,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        let (message, field_errors) = errors.into_parts();
        ApiError::validation_error(message, Some(field_errors))
    }
}

/// Split an extractor message such as
/// "Failed to deserialize the JSON body into the target type: mode: unknown variant ..."
/// into the offending field and its problem.
fn rejection_field(text: &str, fallback: &str) -> (String, String) {
    let detail = text.split_once(": ").map(|(_, rest)| rest).unwrap_or(text);
    match detail.split_once(": ") {
        Some((field, problem)) if !field.is_empty() && !field.contains(char::is_whitespace) => {
            (field.to_string(), problem.to_string())
        }
        _ => (fallback.to_string(), detail.to_string()),
    }
}

fn rejection_error(message: &str, text: &str, fallback: &str) -> ApiError {
    let (field, problem) = rejection_field(text, fallback);
    let mut field_errors = BTreeMap::new();
    field_errors.insert(field, problem);
    ApiError::validation_error(message, Some(field_errors))
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => rejection_error("Invalid request body", &e.body_text(), "body"),
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::bad_request("Expected a request body with Content-Type: application/json")
            }
            other => rejection_error("Invalid request body", &other.body_text(), "body"),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejection_error("Invalid query parameters", &rejection.body_text(), "query")
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::UniqueViolation { message, .. } => ApiError::conflict(message),
            DatabaseError::ForeignKeyViolation { message, .. } => ApiError::conflict(message),
            DatabaseError::CheckViolation { constraint } => {
                ApiError::bad_request(format!("Value rejected by constraint '{}'", constraint))
            }
            DatabaseError::OutOfRange => ApiError::bad_request("Numeric value is too large"),
            DatabaseError::TransactionConflict(code) => {
                tracing::warn!("Transaction aborted by the database ({})", code);
                ApiError::conflict("The record was changed concurrently, please retry")
            }
            DatabaseError::Unavailable(msg) => {
                tracing::error!("Database unavailable: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid email or password"),
            AuthError::MissingToken => ApiError::unauthorized("Authentication required"),
            AuthError::InvalidToken(reason) => {
                tracing::debug!("Rejected token: {}", reason);
                ApiError::unauthorized("Invalid or expired token")
            }
            AuthError::TokenReuse => ApiError::unauthorized("Session is no longer valid, please sign in again"),
            AuthError::AccountDisabled => ApiError::forbidden("Account is disabled"),
            AuthError::Forbidden(msg) => ApiError::forbidden(msg),
            AuthError::WeakPassword(msg) => {
                let mut field_errors = BTreeMap::new();
                field_errors.insert("password".to_string(), msg);
                ApiError::validation_error("Invalid password", Some(field_errors))
            }
            AuthError::Crypto(msg) => {
                tracing::error!("Auth crypto failure: {}", msg);
                ApiError::internal_server_error("Authentication is temporarily unavailable")
            }
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid(errors) => errors.into(),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Rejected(errors) => {
                let (message, field_errors) = errors.into_parts();
                ApiError::unprocessable_entity(message, field_errors)
            }
            ServiceError::Auth(e) => e.into(),
            ServiceError::Filter(e) => e.into(),
            ServiceError::Database(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err: ApiError = DatabaseError::UniqueViolation {
            constraint: "products_sku_key".to_string(),
            message: "A product with this SKU already exists".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "A product with this SKU already exists");
    }

    #[test]
    fn query_errors_do_not_leak_sql() {
        let err: ApiError = DatabaseError::QueryError("syntax error at or near SELECT".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("SELECT"));
    }

    #[test]
    fn field_errors_are_serialized() {
        let mut errors = FieldErrors::new("Invalid payment");
        errors.add("reference_number", "is required for upi payments");
        let body = ApiError::from(errors).to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["reference_number"], "is required for upi payments");
    }

    #[test]
    fn overflow_and_deadlock_are_client_errors() {
        let err: ApiError = DatabaseError::OutOfRange.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err: ApiError = DatabaseError::TransactionConflict("40P01".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn rejection_text_names_the_field() {
        let (field, problem) = rejection_field(
            "Failed to deserialize the JSON body into the target type: mode: unknown variant `crypto`, expected one of `cash`, `upi` at line 1 column 16",
            "body",
        );
        assert_eq!(field, "mode");
        assert!(problem.starts_with("unknown variant `crypto`"));

        let (field, problem) = rejection_field("Failed to parse the request body as JSON: EOF while parsing a value at line 1 column 0", "body");
        assert_eq!(field, "body");
        assert!(problem.contains("EOF while parsing"));
    }

    #[test]
    fn invalid_credentials_are_generic() {
        let err: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Invalid email or password");
    }
}
