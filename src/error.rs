//! Error types for the Lectoria inventory core

use thiserror::Error;

use crate::models::booking::BookingState;

/// Main application error type.
///
/// Every engine failure is a typed value; a failed operation leaves both the
/// catalog and the ledger exactly as they were (transactional rollback).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid quantity {0}: must be between 1 and 5")]
    InvalidQuantity(i32),

    #[error("Insufficient copies of book {book_id}: requested {requested}, remaining {remaining}")]
    InsufficientCopies {
        book_id: i32,
        requested: i32,
        remaining: i32,
    },

    #[error("Holder {holder_id} already has an open booking for book {book_id}")]
    DuplicateOpenBooking { book_id: i32, holder_id: i32 },

    #[error("Invalid transition for booking {booking_id}: {from} -> {to}")]
    InvalidTransition {
        booking_id: i32,
        from: BookingState,
        to: BookingState,
    },

    #[error("Invalid capacity for book {book_id}: new total {new_total} below held quantity {held}")]
    InvalidCapacity {
        book_id: i32,
        new_total: i32,
        held: i32,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may retry the whole operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            // Serialization failure: the whole transaction can be retried.
            if db.code().as_deref() == Some("40001") {
                return AppError::Conflict("transaction serialization failure".to_string());
            }
        }
        AppError::Database(e)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
