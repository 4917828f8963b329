use thiserror::Error;

use crate::validation::ValidationErrors;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return Self::Conflict(format!(
                        "A conflicting record already exists: {}",
                        db.message()
                    ));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return Self::Conflict(format!(
                        "The record is still referenced elsewhere: {}",
                        db.message()
                    ));
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
