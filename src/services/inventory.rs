//! Inventory engine: the booking lifecycle state machine.
//!
//! Reservation and release of copies are reachable only through the
//! transitions below, never through direct counter writes, so
//! `remaining_copies` can never desync from the open bookings that back it.

use chrono::{Duration, Utc};
use std::sync::Arc;
use validator::Validate;

use crate::{
    config::PolicyConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, NewBook},
        booking::{Booking, BookingState, NewBooking, ReserveRequest},
    },
    repository::InventoryStore,
};

/// Attempts per reserve call when the store reports a serialization conflict.
const MAX_RESERVE_ATTEMPTS: u32 = 3;

pub struct InventoryEngine<S> {
    store: Arc<S>,
    policy: PolicyConfig,
}

impl<S> Clone for InventoryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: InventoryStore> InventoryEngine<S> {
    pub fn new(store: Arc<S>, policy: PolicyConfig) -> Self {
        Self { store, policy }
    }

    pub async fn book(&self, book_id: i32) -> AppResult<Book> {
        self.store.book(book_id).await
    }

    pub async fn booking(&self, booking_id: i32) -> AppResult<Booking> {
        self.store.booking(booking_id).await
    }

    /// Add a book to the catalog with all copies available.
    pub async fn create_book(&self, new: NewBook) -> AppResult<Book> {
        if new.total_copies < 0 {
            return Err(AppError::Validation(format!(
                "total_copies must be non-negative, got {}",
                new.total_copies
            )));
        }
        let book = self.store.create_book(&new).await?;
        tracing::info!(
            "Created book {} ({:?}) with {} copies",
            book.id,
            book.title,
            book.total_copies
        );
        Ok(book)
    }

    /// Reserve copies of a book for a holder.
    ///
    /// Decrements availability at reservation time; the booking starts in
    /// `Reserved` with a due date `loan_period_days` after the requested
    /// date. Retries on serialization conflicts before surfacing `Conflict`.
    pub async fn reserve(&self, req: ReserveRequest) -> AppResult<Booking> {
        req.validate()
            .map_err(|_| AppError::InvalidQuantity(req.quantity))?;

        let reserved_at = req.requested_at.unwrap_or_else(Utc::now);
        let new = NewBooking {
            book_id: req.book_id,
            holder_id: req.holder_id,
            quantity: req.quantity,
            reserved_at,
            due_at: reserved_at + Duration::days(self.policy.loan_period_days),
        };

        let mut attempt = 1;
        loop {
            match self.store.create_reservation(&new).await {
                Err(e) if e.is_retryable() && attempt < MAX_RESERVE_ATTEMPTS => {
                    tracing::debug!(
                        "Reserve retry {}/{} for book {} holder {}: {}",
                        attempt,
                        MAX_RESERVE_ATTEMPTS,
                        new.book_id,
                        new.holder_id,
                        e
                    );
                    attempt += 1;
                }
                Ok(booking) => {
                    tracing::info!(
                        "Reserved {} copies of book {} for holder {} (booking {})",
                        booking.quantity,
                        booking.book_id,
                        booking.holder_id,
                        booking.id
                    );
                    return Ok(booking);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Confirm physical handover. No inventory change: the claim was
    /// committed at reservation time.
    pub async fn mark_issued(&self, booking_id: i32) -> AppResult<Booking> {
        self.store
            .commit_transition(booking_id, BookingState::Reserved, BookingState::Issued, false)
            .await
    }

    /// Close an issued booking and release its claim. Returning a
    /// never-issued booking is rejected; those must be cancelled instead.
    pub async fn mark_returned(&self, booking_id: i32) -> AppResult<Booking> {
        let booking = self
            .store
            .commit_transition(booking_id, BookingState::Issued, BookingState::Returned, true)
            .await?;
        tracing::info!(
            "Returned booking {}: {} copies of book {} released",
            booking.id,
            booking.quantity,
            booking.book_id
        );
        Ok(booking)
    }

    /// Cancel a reservation that was never issued, releasing its claim.
    pub async fn cancel(&self, booking_id: i32) -> AppResult<Booking> {
        let booking = self
            .store
            .commit_transition(
                booking_id,
                BookingState::Reserved,
                BookingState::Cancelled,
                true,
            )
            .await?;
        tracing::info!(
            "Cancelled booking {}: {} copies of book {} released",
            booking.id,
            booking.quantity,
            booking.book_id
        );
        Ok(booking)
    }

    /// Change a book's total capacity, re-deriving availability from live
    /// holds. Shrinking below the held quantity is rejected rather than
    /// force-evicting holders.
    pub async fn resize(&self, book_id: i32, new_total: i32) -> AppResult<Book> {
        let book = self.store.resize_book(book_id, new_total).await?;
        tracing::info!(
            "Resized book {} to {} copies ({} remaining)",
            book.id,
            book.total_copies,
            book.remaining_copies
        );
        Ok(book)
    }
}
