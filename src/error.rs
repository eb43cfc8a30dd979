//! Domain errors raised by the author and book handlers.

use std::fmt;

use axum::response::{IntoResponse, Response};
use bookstore_http::AppError;
use thiserror::Error;

/// Entity kinds, used to name what was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Author,
    Book,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Author => f.write_str("Author"),
            Entity::Book => f.write_str("Book"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} not found")]
    NotFound { entity: Entity, id: i64 },

    /// A book pointed at an author that does not exist
    #[error("Author not found")]
    ReferenceViolation { author_id: i64 },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl DomainError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Translate foreign-key failures on a book write into a reference
    /// violation; any other storage error passes through.
    pub fn from_book_write(err: sqlx::Error, author_id: i64) -> Self {
        let is_fk = err
            .as_database_error()
            .is_some_and(|db| db.is_foreign_key_violation());
        if is_fk {
            Self::ReferenceViolation { author_id }
        } else {
            Self::Database(err)
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity, id } => {
                tracing::debug!(%entity, id, "record not found");
                AppError::not_found(format!("{entity} not found"))
            }
            DomainError::ReferenceViolation { author_id } => {
                tracing::debug!(author_id, "book references missing author");
                AppError::not_found(format!("{} not found", Entity::Author))
            }
            DomainError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
