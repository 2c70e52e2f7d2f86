//! Catalog store: book rows and the atomic counter primitives.
//!
//! `try_reserve` and `release` are the only writers of `remaining_copies`;
//! both run on a connection already inside the caller's transaction.

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, NewBook},
};

/// Get book by ID
pub async fn fetch(conn: &mut PgConnection, book_id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
}

/// Get book by ID, locking the row for the rest of the transaction.
pub async fn fetch_for_update(conn: &mut PgConnection, book_id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
}

/// Insert a new book with `remaining_copies` starting at full capacity.
pub async fn insert(conn: &mut PgConnection, new: &NewBook) -> AppResult<Book> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (title, total_copies, remaining_copies)
        VALUES ($1, $2, $2)
        RETURNING *
        "#,
    )
    .bind(&new.title)
    .bind(new.total_copies)
    .fetch_one(conn)
    .await?;

    Ok(book)
}

/// Conditionally decrement `remaining_copies` by `qty`.
///
/// Returns `false` without mutation when fewer than `qty` copies remain.
pub async fn try_reserve(conn: &mut PgConnection, book_id: i32, qty: i32) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET remaining_copies = remaining_copies - $2
        WHERE id = $1 AND remaining_copies >= $2
        "#,
    )
    .bind(book_id)
    .bind(qty)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Credit `qty` copies back, clamped at `total_copies`.
///
/// Exceeding the total means the ledger and the counter have drifted; the
/// clamp keeps the drift from compounding and the warning makes it visible.
pub async fn release(conn: &mut PgConnection, book_id: i32, qty: i32) -> AppResult<()> {
    let book = fetch_for_update(&mut *conn, book_id).await?;

    if book.remaining_copies + qty > book.total_copies {
        tracing::warn!(
            "Inventory drift on book {}: releasing {} onto {}/{} copies, clamping to total",
            book_id,
            qty,
            book.remaining_copies,
            book.total_copies
        );
    }

    sqlx::query(
        r#"
        UPDATE books
        SET remaining_copies = LEAST(remaining_copies + $2, total_copies)
        WHERE id = $1
        "#,
    )
    .bind(book_id)
    .bind(qty)
    .execute(conn)
    .await?;

    Ok(())
}

/// Write a new total and the re-derived remaining count.
/// The caller has already validated `new_total` against held quantity.
pub async fn apply_resize(
    conn: &mut PgConnection,
    book_id: i32,
    new_total: i32,
    held: i32,
) -> AppResult<Book> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        UPDATE books
        SET total_copies = $2, remaining_copies = $2 - $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(book_id)
    .bind(new_total)
    .bind(held)
    .fetch_one(conn)
    .await?;

    Ok(book)
}
