//! Entitlement evaluation.
//!
//! Access is derived, never stored: internal staff membership for the
//! tenant, an active/trialing subscription, or a succeeded one-time payment
//! each grant it. The staff check runs first and short-circuits the billing
//! queries entirely.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::role::Role;

/// Subscription statuses that grant access.
const ENTITLED_SUBSCRIPTION: [&str; 2] = ["active", "trialing"];

/// One-time payment statuses that grant access.
const ENTITLED_PAYMENT: [&str; 2] = ["succeeded", "paid"];

/// Whether the principal currently has feature access for the tenant.
pub async fn has_access(
    pool: &SqlitePool,
    principal_id: &str,
    role: Role,
    client_id: &str,
) -> Result<bool> {
    if role == Role::Admin {
        return Ok(true);
    }
    if role.is_internal()
        && database::client::is_client_staff(pool, principal_id, client_id).await?
    {
        return Ok(true);
    }

    // Existence scans, not latest-row reads: a canceled subscription or a
    // later declined payment attempt never revokes what a qualifying row
    // already granted.
    if database::billing::subscription_in_status_exists(pool, client_id, &ENTITLED_SUBSCRIPTION)
        .await?
    {
        return Ok(true);
    }

    if database::billing::payment_in_status_exists(pool, client_id, &ENTITLED_PAYMENT).await? {
        return Ok(true);
    }

    Ok(false)
}
