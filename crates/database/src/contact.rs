//! Contact records.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::Contact;

/// Create a contact.
pub async fn create_contact(pool: &SqlitePool, contact: &Contact) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO contacts (id, client_id, name, phone_number)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&contact.id)
    .bind(&contact.client_id)
    .bind(&contact.name)
    .bind(&contact.phone_number)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a contact by id within a tenant.
pub async fn get_contact(pool: &SqlitePool, client_id: &str, id: &str) -> Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(
        r#"
        SELECT id, client_id, name, phone_number
        FROM contacts
        WHERE client_id = ? AND id = ?
        "#,
    )
    .bind(client_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}

/// Best-effort match of a contact by phone number within a tenant.
pub async fn find_by_phone(
    pool: &SqlitePool,
    client_id: &str,
    phone_number: &str,
) -> Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(
        r#"
        SELECT id, client_id, name, phone_number
        FROM contacts
        WHERE client_id = ? AND phone_number = ?
        LIMIT 1
        "#,
    )
    .bind(client_id)
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}
