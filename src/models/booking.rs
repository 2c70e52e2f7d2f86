//! Booking model and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// Lifecycle state of a booking.
///
/// Legal transitions: `Reserved -> Issued -> Returned` and
/// `Reserved -> Cancelled`. `Returned` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    Reserved,
    Issued,
    Returned,
    Cancelled,
}

impl BookingState {
    /// An open booking holds a live claim on inventory.
    pub fn is_open(self) -> bool {
        matches!(self, BookingState::Reserved | BookingState::Issued)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingState::Returned | BookingState::Cancelled)
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingState::Reserved => "reserved",
            BookingState::Issued => "issued",
            BookingState::Returned => "returned",
            BookingState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Booking model from database.
///
/// A booking owns a claim on `quantity` copies of its book from creation
/// until it reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i32,
    pub book_id: i32,
    pub holder_id: i32,
    pub quantity: i32,
    pub state: BookingState,
    pub reserved_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Reserve request from the caller (HTTP glue or sweeper peers).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReserveRequest {
    pub book_id: i32,
    pub holder_id: i32,
    #[validate(range(min = 1, max = 5))]
    pub quantity: i32,
    /// Reservation date; defaults to now. The due date derives from it.
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

/// Fully resolved reservation handed to the store for atomic insertion.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub book_id: i32,
    pub holder_id: i32,
    pub quantity: i32,
    pub reserved_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}
