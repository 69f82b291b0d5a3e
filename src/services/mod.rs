//! Business operations. Handlers stay thin and call into these.

pub mod activity_service;
pub mod auth_service;
pub mod distributor_service;
pub mod order_service;
pub mod payment_service;
pub mod pricing;
pub mod product_service;

pub use activity_service::{ActivityService, NewActivity};
pub use auth_service::AuthService;
pub use distributor_service::DistributorService;
pub use order_service::OrderService;
pub use payment_service::PaymentService;
pub use product_service::ProductService;

use thiserror::Error;

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::database::repository::ListError;
use crate::filter::error::FilterError;
use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input (400)
    #[error("{0}")]
    Invalid(FieldErrors),

    /// Well-formed input refused by a business rule (422)
    #[error("{0}")]
    Rejected(FieldErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(err.into())
    }
}

impl From<ListError> for ServiceError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::Filter(e) => ServiceError::Filter(e),
            ListError::Database(e) => ServiceError::Database(e),
        }
    }
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Invalid(errors)
    }
}

impl ServiceError {
    pub fn rejected(message: impl Into<String>, field: &str, problem: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new(message);
        errors.add(field, problem);
        ServiceError::Rejected(errors)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
