//! Domain error types for the invoices module.

use tenantkit_db::secure::ScopeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// The entity does not exist in the caller's data partition.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl DomainError {
    #[must_use]
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
