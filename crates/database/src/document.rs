//! Document extraction history.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::DocumentExtraction;

/// Append an extraction result. History is never overwritten.
pub async fn insert_extraction(pool: &SqlitePool, extraction: &DocumentExtraction) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO document_extractions (id, client_id, storage_path, result, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&extraction.id)
    .bind(&extraction.client_id)
    .bind(&extraction.storage_path)
    .bind(&extraction.result)
    .bind(&extraction.created_by)
    .bind(&extraction.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// The latest extraction for a storage path, resolved in SQL rather than by
/// fetching the whole history.
pub async fn latest_for_path(
    pool: &SqlitePool,
    client_id: &str,
    storage_path: &str,
) -> Result<Option<DocumentExtraction>> {
    let extraction = sqlx::query_as::<_, DocumentExtraction>(
        r#"
        SELECT id, client_id, storage_path, result, created_by, created_at
        FROM document_extractions
        WHERE client_id = ? AND storage_path = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(client_id)
    .bind(storage_path)
    .fetch_optional(pool)
    .await?;

    Ok(extraction)
}

/// Full extraction history for a path, newest first.
pub async fn history_for_path(
    pool: &SqlitePool,
    client_id: &str,
    storage_path: &str,
) -> Result<Vec<DocumentExtraction>> {
    let rows = sqlx::query_as::<_, DocumentExtraction>(
        r#"
        SELECT id, client_id, storage_path, result, created_by, created_at
        FROM document_extractions
        WHERE client_id = ? AND storage_path = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(client_id)
    .bind(storage_path)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
