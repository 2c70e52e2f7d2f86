//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Book model from database.
///
/// `remaining_copies` is owned by the inventory engine: for every book,
/// `remaining_copies == total_copies - sum(quantity of open bookings)`.
/// Collaborators never write the counter directly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub total_copies: i32,
    pub remaining_copies: i32,
    pub created_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub total_copies: i32,
}
