//! Append-only audit log.

use sqlx::SqlitePool;

use crate::error::Result;

/// Write an audit entry.
pub async fn write(
    pool: &SqlitePool,
    client_id: &str,
    actor: &str,
    action: &str,
    detail: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (client_id, actor, action, detail)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(client_id)
    .bind(actor)
    .bind(action)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count audit entries for a tenant (test/diagnostic helper).
pub async fn count_for_client(pool: &SqlitePool, client_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM audit_log WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
