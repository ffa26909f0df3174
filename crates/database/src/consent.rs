//! Consent and do-not-contact state.
//!
//! Both checks run before any outbound provider call: an explicit DNC row is
//! an unconditional veto, and the most recent consent row per
//! (contact, channel) governs when present.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::ConsentRecord;

/// Append a consent record. History is append-only; reads take the latest.
pub async fn record_consent(
    pool: &SqlitePool,
    client_id: &str,
    contact_id: &str,
    channel: &str,
    status: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO consent_records (client_id, contact_id, channel, status)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(client_id)
    .bind(contact_id)
    .bind(channel)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(())
}

/// The most recent consent record for a contact/channel pair, if any.
pub async fn latest_consent(
    pool: &SqlitePool,
    client_id: &str,
    contact_id: &str,
    channel: &str,
) -> Result<Option<ConsentRecord>> {
    let record = sqlx::query_as::<_, ConsentRecord>(
        r#"
        SELECT id, client_id, contact_id, channel, status, created_at
        FROM consent_records
        WHERE client_id = ? AND contact_id = ? AND channel = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(client_id)
    .bind(contact_id)
    .bind(channel)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Add a contact to the do-not-contact list. Idempotent.
pub async fn add_dnc(pool: &SqlitePool, client_id: &str, contact_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dnc_entries (client_id, contact_id)
        VALUES (?, ?)
        ON CONFLICT (client_id, contact_id) DO NOTHING
        "#,
    )
    .bind(client_id)
    .bind(contact_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the contact is on the tenant's do-not-contact list.
pub async fn is_dnc(pool: &SqlitePool, client_id: &str, contact_id: &str) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM dnc_entries
        WHERE client_id = ? AND contact_id = ?
        "#,
    )
    .bind(client_id)
    .bind(contact_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}
