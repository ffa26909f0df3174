//! Profile rows for authenticated principals.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::Profile;

/// Insert or update a profile.
pub async fn upsert_profile(pool: &SqlitePool, profile: &Profile) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (id, email, display_name, role)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            email = excluded.email,
            display_name = excluded.display_name,
            role = excluded.role
        "#,
    )
    .bind(&profile.id)
    .bind(&profile.email)
    .bind(&profile.display_name)
    .bind(&profile.role)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a profile by principal id, if one exists.
///
/// Absence is not an error here: the access layer treats a missing profile
/// as the non-privileged default role.
pub async fn get_profile(pool: &SqlitePool, id: &str) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, email, display_name, role
        FROM profiles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Look up a profile by email, if one exists.
pub async fn get_profile_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, email, display_name, role
        FROM profiles
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}
