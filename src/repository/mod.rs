//! Storage layer: the `InventoryStore` seam and its Postgres implementation.
//!
//! Each trait method is one atomic unit of work. The Postgres implementation
//! runs every compound operation inside a single transaction with row locks
//! scoped to the affected book or booking, so no intermediate state is ever
//! observable and concurrent reservations cannot oversell.

pub mod bookings;
pub mod catalog;
pub mod holders;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, NewBook},
        booking::{Booking, BookingState, NewBooking},
    },
};

/// Atomic storage operations the inventory engine runs on.
///
/// The engine owns the state machine and the policy; the store owns
/// atomicity. Injected explicitly so tests can swap in [`memory::MemoryStore`]
/// or a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn book(&self, book_id: i32) -> AppResult<Book>;

    async fn booking(&self, booking_id: i32) -> AppResult<Booking>;

    /// Sum of quantities of open bookings on a book.
    async fn held_quantity(&self, book_id: i32) -> AppResult<i64>;

    async fn create_book(&self, new: &NewBook) -> AppResult<Book>;

    /// Atomically: check capacity, check the one-open-booking-per-holder
    /// rule, decrement `remaining_copies` and insert the `Reserved` row.
    /// Any failure leaves the catalog untouched.
    async fn create_reservation(&self, new: &NewBooking) -> AppResult<Booking>;

    /// Compare-and-set the booking state from `from` to `to`; when `release`
    /// is set, credit the booking's quantity back to the book in the same
    /// transaction. First committer wins; the loser gets `InvalidTransition`.
    async fn commit_transition(
        &self,
        booking_id: i32,
        from: BookingState,
        to: BookingState,
        release: bool,
    ) -> AppResult<Booking>;

    /// Set a new `total_copies` and re-derive `remaining_copies` from live
    /// holds. Fails with `InvalidCapacity` when `new_total` is below the
    /// currently held quantity.
    async fn resize_book(&self, book_id: i32, new_total: i32) -> AppResult<Book>;

    /// Bookings still `Reserved` whose reservation date is at or before `cutoff`.
    async fn expired_reservations(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Booking>>;

    /// Deactivate active holders whose last renewal is before `cutoff`.
    /// Returns the number of accounts deactivated.
    async fn deactivate_stale_holders(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Postgres-backed store holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl InventoryStore for Repository {
    async fn book(&self, book_id: i32) -> AppResult<Book> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch(&mut *conn, book_id).await
    }

    async fn booking(&self, booking_id: i32) -> AppResult<Booking> {
        let mut conn = self.pool.acquire().await?;
        bookings::fetch(&mut *conn, booking_id).await
    }

    async fn held_quantity(&self, book_id: i32) -> AppResult<i64> {
        let mut conn = self.pool.acquire().await?;
        bookings::held_quantity(&mut *conn, book_id).await
    }

    async fn create_book(&self, new: &NewBook) -> AppResult<Book> {
        let mut conn = self.pool.acquire().await?;
        catalog::insert(&mut *conn, new).await
    }

    async fn create_reservation(&self, new: &NewBooking) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        // Locks the book row; concurrent reservations for the same book
        // serialize here.
        let book = catalog::fetch_for_update(&mut *tx, new.book_id).await?;

        if !catalog::try_reserve(&mut *tx, new.book_id, new.quantity).await? {
            return Err(AppError::InsufficientCopies {
                book_id: new.book_id,
                requested: new.quantity,
                remaining: book.remaining_copies,
            });
        }

        if bookings::open_for(&mut *tx, new.book_id, new.holder_id)
            .await?
            .is_some()
        {
            // Dropping the transaction rolls the decrement back.
            return Err(AppError::DuplicateOpenBooking {
                book_id: new.book_id,
                holder_id: new.holder_id,
            });
        }

        let booking = bookings::insert_reserved(&mut *tx, new).await?;
        tx.commit().await?;

        Ok(booking)
    }

    async fn commit_transition(
        &self,
        booking_id: i32,
        from: BookingState,
        to: BookingState,
        release: bool,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let booking = bookings::fetch_for_update(&mut *tx, booking_id).await?;
        if booking.state != from {
            return Err(AppError::InvalidTransition {
                booking_id,
                from: booking.state,
                to,
            });
        }

        let updated = bookings::set_state(&mut *tx, booking_id, to).await?;
        if release {
            catalog::release(&mut *tx, booking.book_id, booking.quantity).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn resize_book(&self, book_id: i32, new_total: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        catalog::fetch_for_update(&mut *tx, book_id).await?;
        let held = bookings::held_quantity(&mut *tx, book_id).await?;

        if i64::from(new_total) < held {
            return Err(AppError::InvalidCapacity {
                book_id,
                new_total,
                held: held as i32,
            });
        }

        let book = catalog::apply_resize(&mut *tx, book_id, new_total, held as i32).await?;
        tx.commit().await?;

        Ok(book)
    }

    async fn expired_reservations(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Booking>> {
        let mut conn = self.pool.acquire().await?;
        bookings::find_expired_reservations(&mut *conn, cutoff).await
    }

    async fn deactivate_stale_holders(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut conn = self.pool.acquire().await?;
        holders::deactivate_stale(&mut *conn, cutoff).await
    }
}
