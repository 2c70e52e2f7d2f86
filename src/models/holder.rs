//! Holder (registered reader) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Holder account. Only the fields the core needs: identity plus the
/// registration dates driving the deactivation sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Holder {
    pub id: i32,
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub renewed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Holder {
    /// Date the deactivation sweep compares against the renewal threshold.
    pub fn last_renewal(&self) -> DateTime<Utc> {
        self.renewed_at.unwrap_or(self.registered_at)
    }
}
