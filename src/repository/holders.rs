//! Holder account bookkeeping used by the deactivation sweep

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::error::AppResult;

/// Deactivate active holders whose last renewal (registration date when they
/// never renewed) is before `cutoff`. Returns the number of rows updated.
pub async fn deactivate_stale(conn: &mut PgConnection, cutoff: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE holders
        SET is_active = FALSE
        WHERE is_active AND COALESCE(renewed_at, registered_at) < $1
        "#,
    )
    .bind(cutoff)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
