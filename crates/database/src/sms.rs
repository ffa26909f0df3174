//! SMS threads and messages.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{SmsMessage, SmsThread};

/// Upsert a thread by `(tenant, counterparty number)` and return its id.
pub async fn upsert_thread(
    pool: &SqlitePool,
    client_id: &str,
    counterparty_number: &str,
) -> Result<String> {
    let candidate_id = Uuid::new_v4().to_string();

    // Insert-or-ignore, then read back: the returning row is the surviving
    // thread whether or not this call created it.
    sqlx::query(
        r#"
        INSERT INTO sms_threads (id, client_id, counterparty_number)
        VALUES (?, ?, ?)
        ON CONFLICT (client_id, counterparty_number) DO NOTHING
        "#,
    )
    .bind(&candidate_id)
    .bind(client_id)
    .bind(counterparty_number)
    .execute(pool)
    .await?;

    let id = sqlx::query_scalar::<_, String>(
        r#"
        SELECT id FROM sms_threads
        WHERE client_id = ? AND counterparty_number = ?
        "#,
    )
    .bind(client_id)
    .bind(counterparty_number)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert a message row. The provider sid must be unique; later status
/// webhooks correlate through it.
pub async fn insert_message(pool: &SqlitePool, message: &SmsMessage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sms_messages
            (id, thread_id, provider_sid, direction, body, status, error_code, sent_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.thread_id)
    .bind(&message.provider_sid)
    .bind(&message.direction)
    .bind(&message.body)
    .bind(&message.status)
    .bind(&message.error_code)
    .bind(&message.sent_by)
    .bind(&message.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply a delivery-status update by provider sid.
///
/// Returns `false` when the sid is unknown; callers treat that as a logged
/// no-op, not an error.
pub async fn update_message_status(
    pool: &SqlitePool,
    provider_sid: &str,
    status: &str,
    error_code: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sms_messages
        SET status = ?, error_code = ?
        WHERE provider_sid = ?
        "#,
    )
    .bind(status)
    .bind(error_code)
    .bind(provider_sid)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Get a message by provider sid.
pub async fn get_message_by_sid(
    pool: &SqlitePool,
    provider_sid: &str,
) -> Result<Option<SmsMessage>> {
    let message = sqlx::query_as::<_, SmsMessage>(
        r#"
        SELECT id, thread_id, provider_sid, direction, body, status, error_code, sent_by, created_at
        FROM sms_messages
        WHERE provider_sid = ?
        "#,
    )
    .bind(provider_sid)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}

/// Count message rows for a tenant (test/diagnostic helper).
pub async fn message_count_for_client(pool: &SqlitePool, client_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM sms_messages m
        JOIN sms_threads t ON t.id = m.thread_id
        WHERE t.client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List a tenant's threads.
pub async fn threads_for_client(pool: &SqlitePool, client_id: &str) -> Result<Vec<SmsThread>> {
    let threads = sqlx::query_as::<_, SmsThread>(
        r#"
        SELECT id, client_id, counterparty_number
        FROM sms_threads
        WHERE client_id = ?
        ORDER BY counterparty_number
        "#,
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    Ok(threads)
}
