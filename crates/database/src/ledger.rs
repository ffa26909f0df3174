//! Idempotency ledger over the `external_events` table.
//!
//! Upstream providers deliver webhooks at least once; this ledger turns that
//! into at-most-once side-effect application. Every webhook handler calls
//! [`record_if_new`] before mutating anything else and stops (acknowledging
//! success) when it returns `false`.

use sqlx::SqlitePool;

use crate::error::Result;

/// Record a delivery exactly once.
///
/// The composite key is `(source, event_type, external_id)`. The insert is a
/// single conditional statement, so concurrent deliveries of the same event
/// race safely: the first to commit wins and every other invocation observes
/// `false`.
///
/// Status-transition events append the status to `external_id`
/// (`"SM123:delivered"`) so each distinct transition for the same provider
/// id is applied once, not just the first.
pub async fn record_if_new(
    pool: &SqlitePool,
    source: &str,
    event_type: &str,
    external_id: &str,
    payload: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO external_events (source, event_type, external_id, payload)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (source, event_type, external_id) DO NOTHING
        "#,
    )
    .bind(source)
    .bind(event_type)
    .bind(external_id)
    .bind(payload)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() > 0;
    if !inserted {
        tracing::debug!(source, event_type, external_id, "duplicate delivery ignored");
    }
    Ok(inserted)
}

/// Build the `external_id` for a status-transition event.
pub fn status_key(provider_id: &str, status: &str) -> String {
    format!("{provider_id}:{status}")
}

/// Count ledger rows for a given source (test/diagnostic helper).
pub async fn count_for_source(pool: &SqlitePool, source: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM external_events WHERE source = ?
        "#,
    )
    .bind(source)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
