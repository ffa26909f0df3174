//! Tenant (client) records and membership grants.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Client, Profile};

/// Create a new tenant.
pub async fn create_client(pool: &SqlitePool, client: &Client) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO clients (id, name, created_by, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&client.id)
    .bind(&client.name)
    .bind(&client.created_by)
    .bind(&client.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Client",
                    id: client.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a tenant by id.
pub async fn get_client(pool: &SqlitePool, id: &str) -> Result<Client> {
    sqlx::query_as::<_, Client>(
        r#"
        SELECT id, name, created_by, created_at
        FROM clients
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Client",
        id: id.to_string(),
    })
}

/// Grant a client-role login access to a tenant. Idempotent.
pub async fn grant_client_user(pool: &SqlitePool, profile_id: &str, client_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO client_users (profile_id, client_id)
        VALUES (?, ?)
        ON CONFLICT (profile_id, client_id) DO NOTHING
        "#,
    )
    .bind(profile_id)
    .bind(client_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Assign an internal staff member to service a tenant. Idempotent.
pub async fn grant_client_staff(pool: &SqlitePool, profile_id: &str, client_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO client_staff (profile_id, client_id)
        VALUES (?, ?)
        ON CONFLICT (profile_id, client_id) DO NOTHING
        "#,
    )
    .bind(profile_id)
    .bind(client_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the principal has a client-user grant for the tenant.
pub async fn is_client_user(pool: &SqlitePool, profile_id: &str, client_id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM client_users
        WHERE profile_id = ? AND client_id = ?
        "#,
    )
    .bind(profile_id)
    .bind(client_id)
    .fetch_one(pool)
    .await?;

    Ok(exists > 0)
}

/// Whether the principal has a staff assignment for the tenant.
pub async fn is_client_staff(pool: &SqlitePool, profile_id: &str, client_id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM client_staff
        WHERE profile_id = ? AND client_id = ?
        "#,
    )
    .bind(profile_id)
    .bind(client_id)
    .fetch_one(pool)
    .await?;

    Ok(exists > 0)
}

/// Profiles eligible to take an inbound call for a tenant: the tenant's
/// assigned staff plus every admin.
pub async fn call_candidates(pool: &SqlitePool, client_id: &str) -> Result<Vec<Profile>> {
    let profiles = sqlx::query_as::<_, Profile>(
        r#"
        SELECT DISTINCT p.id, p.email, p.display_name, p.role
        FROM profiles p
        LEFT JOIN client_staff cs ON cs.profile_id = p.id AND cs.client_id = ?
        WHERE cs.profile_id IS NOT NULL OR p.role = 'admin'
        "#,
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    Ok(profiles)
}
