//! Telephony state: per-tenant settings, softphone identities, calls and
//! their append-only event trail.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Call, TelephonyIdentity, TelephonySettings};

/// Insert or replace a tenant's telephony settings.
pub async fn upsert_settings(pool: &SqlitePool, settings: &TelephonySettings) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO telephony_settings (client_id, phone_number, fallback_number)
        VALUES (?, ?, ?)
        ON CONFLICT (client_id) DO UPDATE SET
            phone_number = excluded.phone_number,
            fallback_number = excluded.fallback_number
        "#,
    )
    .bind(&settings.client_id)
    .bind(&settings.phone_number)
    .bind(&settings.fallback_number)
    .execute(pool)
    .await?;

    Ok(())
}

/// Resolve the tenant owning a provisioned number. This is the inbound
/// routing lookup: the key is the *dialed* number.
pub async fn settings_for_number(
    pool: &SqlitePool,
    phone_number: &str,
) -> Result<Option<TelephonySettings>> {
    let settings = sqlx::query_as::<_, TelephonySettings>(
        r#"
        SELECT client_id, phone_number, fallback_number
        FROM telephony_settings
        WHERE phone_number = ?
        "#,
    )
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(settings)
}

/// Get a tenant's telephony settings by tenant id.
pub async fn settings_for_client(
    pool: &SqlitePool,
    client_id: &str,
) -> Result<Option<TelephonySettings>> {
    let settings = sqlx::query_as::<_, TelephonySettings>(
        r#"
        SELECT client_id, phone_number, fallback_number
        FROM telephony_settings
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?;

    Ok(settings)
}

/// Register (or refresh) a principal's softphone identity.
pub async fn touch_identity(
    pool: &SqlitePool,
    profile_id: &str,
    client_identity: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO telephony_identities (profile_id, client_identity, last_seen_at)
        VALUES (?, ?, datetime('now'))
        ON CONFLICT (profile_id) DO UPDATE SET
            client_identity = excluded.client_identity,
            last_seen_at = datetime('now')
        "#,
    )
    .bind(profile_id)
    .bind(client_identity)
    .execute(pool)
    .await?;

    Ok(())
}

/// The most recently seen softphone identity among a candidate pool of
/// profile ids. Returns `None` when nobody in the pool has registered.
pub async fn most_recent_identity(
    pool: &SqlitePool,
    profile_ids: &[String],
) -> Result<Option<TelephonyIdentity>> {
    if profile_ids.is_empty() {
        return Ok(None);
    }

    // sqlx sqlite has no array binds; build the placeholder list.
    let placeholders = vec!["?"; profile_ids.len()].join(", ");
    let sql = format!(
        "SELECT profile_id, client_identity, last_seen_at \
         FROM telephony_identities \
         WHERE profile_id IN ({placeholders}) \
         ORDER BY last_seen_at DESC \
         LIMIT 1"
    );

    let mut query = sqlx::query_as::<_, TelephonyIdentity>(&sql);
    for id in profile_ids {
        query = query.bind(id);
    }
    let identity = query.fetch_optional(pool).await?;

    Ok(identity)
}

/// Resolve a softphone identity string back to its principal, if registered.
pub async fn profile_for_identity(
    pool: &SqlitePool,
    client_identity: &str,
) -> Result<Option<String>> {
    let profile_id = sqlx::query_scalar::<_, String>(
        r#"
        SELECT profile_id FROM telephony_identities
        WHERE client_identity = ?
        ORDER BY last_seen_at DESC
        LIMIT 1
        "#,
    )
    .bind(client_identity)
    .fetch_optional(pool)
    .await?;

    Ok(profile_id)
}

/// Upsert a call by its provider call sid.
///
/// Conflict resolution updates: status, answered_by. Identity columns
/// (tenant, direction, numbers) keep their first-write values.
pub async fn upsert_call(pool: &SqlitePool, call: &Call) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO calls (call_sid, client_id, direction, from_number, to_number, status, answered_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (call_sid) DO UPDATE SET
            status = excluded.status,
            answered_by = COALESCE(excluded.answered_by, calls.answered_by)
        "#,
    )
    .bind(&call.call_sid)
    .bind(&call.client_id)
    .bind(&call.direction)
    .bind(&call.from_number)
    .bind(&call.to_number)
    .bind(&call.status)
    .bind(&call.answered_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a call by provider sid.
pub async fn get_call(pool: &SqlitePool, call_sid: &str) -> Result<Option<Call>> {
    let call = sqlx::query_as::<_, Call>(
        r#"
        SELECT call_sid, client_id, direction, from_number, to_number, status, answered_by
        FROM calls
        WHERE call_sid = ?
        "#,
    )
    .bind(call_sid)
    .fetch_optional(pool)
    .await?;

    Ok(call)
}

/// Append a raw payload to a call's audit trail.
pub async fn append_call_event(pool: &SqlitePool, call_sid: &str, payload: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO call_events (call_sid, payload)
        VALUES (?, ?)
        "#,
    )
    .bind(call_sid)
    .bind(payload)
    .execute(pool)
    .await?;

    Ok(())
}

/// Number of audit-trail rows for a call.
pub async fn call_event_count(pool: &SqlitePool, call_sid: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM call_events WHERE call_sid = ?
        "#,
    )
    .bind(call_sid)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
