//! Booking ledger: booking rows and the queries the engine needs

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, BookingState, NewBooking},
};

/// Get booking by ID
pub async fn fetch(conn: &mut PgConnection, booking_id: i32) -> AppResult<Booking> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))
}

/// Get booking by ID, locking the row for the rest of the transaction.
pub async fn fetch_for_update(conn: &mut PgConnection, booking_id: i32) -> AppResult<Booking> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))
}

/// Open booking (reserved or issued) for a (book, holder) pair, if any.
pub async fn open_for(
    conn: &mut PgConnection,
    book_id: i32,
    holder_id: i32,
) -> AppResult<Option<Booking>> {
    let booking = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE book_id = $1 AND holder_id = $2 AND state IN ('reserved', 'issued')
        "#,
    )
    .bind(book_id)
    .bind(holder_id)
    .fetch_optional(conn)
    .await?;

    Ok(booking)
}

/// Sum of quantities currently held against a book.
pub async fn held_quantity(conn: &mut PgConnection, book_id: i32) -> AppResult<i64> {
    let held: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(quantity), 0)
        FROM bookings
        WHERE book_id = $1 AND state IN ('reserved', 'issued')
        "#,
    )
    .bind(book_id)
    .fetch_one(conn)
    .await?;

    Ok(held)
}

/// Insert a booking in `Reserved` state.
///
/// The partial unique index backs the one-open-booking-per-holder rule even
/// if the application-level check is bypassed.
pub async fn insert_reserved(conn: &mut PgConnection, new: &NewBooking) -> AppResult<Booking> {
    let result = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (book_id, holder_id, quantity, state, reserved_at, due_at)
        VALUES ($1, $2, $3, 'reserved', $4, $5)
        RETURNING *
        "#,
    )
    .bind(new.book_id)
    .bind(new.holder_id)
    .bind(new.quantity)
    .bind(new.reserved_at)
    .bind(new.due_at)
    .fetch_one(conn)
    .await;

    match result {
        Ok(booking) => Ok(booking),
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
            Err(AppError::DuplicateOpenBooking {
                book_id: new.book_id,
                holder_id: new.holder_id,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Write the new state and the matching timestamp.
pub async fn set_state(
    conn: &mut PgConnection,
    booking_id: i32,
    to: BookingState,
) -> AppResult<Booking> {
    let now = Utc::now();
    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET state = $2,
            issued_at = CASE WHEN $2 = 'issued'::booking_state THEN $3 ELSE issued_at END,
            closed_at = CASE WHEN $2 IN ('returned'::booking_state, 'cancelled'::booking_state)
                             THEN $3 ELSE closed_at END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(booking_id)
    .bind(to)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(booking)
}

/// Reservations never confirmed within the grace window.
pub async fn find_expired_reservations(
    conn: &mut PgConnection,
    cutoff: DateTime<Utc>,
) -> AppResult<Vec<Booking>> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE state = 'reserved' AND reserved_at <= $1
        ORDER BY reserved_at
        "#,
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await?;

    Ok(bookings)
}
