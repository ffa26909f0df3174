//! Billing state: customer mapping, subscriptions, one-time payments.
//!
//! All writes are upserts keyed by the payment provider's own object id, so
//! repeated or out-of-order webhook deliveries referencing the same object
//! converge to a single row.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{BillingCustomer, Payment, Subscription};

/// Record the tenant ↔ provider-customer mapping. Idempotent.
pub async fn upsert_customer(
    pool: &SqlitePool,
    client_id: &str,
    stripe_customer_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO billing_customers (client_id, stripe_customer_id)
        VALUES (?, ?)
        ON CONFLICT (client_id) DO UPDATE SET
            stripe_customer_id = excluded.stripe_customer_id
        "#,
    )
    .bind(client_id)
    .bind(stripe_customer_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Resolve the tenant owning a provider customer id, if mapped.
pub async fn client_for_customer(
    pool: &SqlitePool,
    stripe_customer_id: &str,
) -> Result<Option<String>> {
    let client_id = sqlx::query_scalar::<_, String>(
        r#"
        SELECT client_id FROM billing_customers
        WHERE stripe_customer_id = ?
        "#,
    )
    .bind(stripe_customer_id)
    .fetch_optional(pool)
    .await?;

    Ok(client_id)
}

/// Get the cached customer mapping for a tenant, if any.
pub async fn customer_for_client(
    pool: &SqlitePool,
    client_id: &str,
) -> Result<Option<BillingCustomer>> {
    let row = sqlx::query_as::<_, BillingCustomer>(
        r#"
        SELECT client_id, stripe_customer_id
        FROM billing_customers
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Upsert a subscription by its provider id.
///
/// Conflict resolution updates: client_id, status, price_id,
/// current_period_end, cancel_at_period_end.
pub async fn upsert_subscription(pool: &SqlitePool, sub: &Subscription) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO billing_subscriptions
            (stripe_subscription_id, client_id, status, price_id,
             current_period_end, cancel_at_period_end)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (stripe_subscription_id) DO UPDATE SET
            client_id = excluded.client_id,
            status = excluded.status,
            price_id = excluded.price_id,
            current_period_end = excluded.current_period_end,
            cancel_at_period_end = excluded.cancel_at_period_end
        "#,
    )
    .bind(&sub.stripe_subscription_id)
    .bind(&sub.client_id)
    .bind(&sub.status)
    .bind(&sub.price_id)
    .bind(&sub.current_period_end)
    .bind(sub.cancel_at_period_end)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the tenant has any subscription in one of the given statuses.
///
/// An existence scan, not a latest-row read: a tenant can hold several
/// subscription rows (a canceled one next to an active one) and any row in
/// a qualifying status counts.
pub async fn subscription_in_status_exists(
    pool: &SqlitePool,
    client_id: &str,
    statuses: &[&str],
) -> Result<bool> {
    if statuses.is_empty() {
        return Ok(false);
    }

    // sqlx sqlite has no array binds; build the placeholder list.
    let placeholders = vec!["?"; statuses.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM billing_subscriptions \
         WHERE client_id = ? AND status IN ({placeholders})"
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(client_id);
    for status in statuses {
        query = query.bind(*status);
    }
    let count = query.fetch_one(pool).await?;

    Ok(count > 0)
}

/// Get a subscription by its provider id.
pub async fn get_subscription(
    pool: &SqlitePool,
    stripe_subscription_id: &str,
) -> Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT stripe_subscription_id, client_id, status, price_id,
               current_period_end, cancel_at_period_end
        FROM billing_subscriptions
        WHERE stripe_subscription_id = ?
        "#,
    )
    .bind(stripe_subscription_id)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

/// Count subscription rows for a single provider subscription id.
pub async fn subscription_row_count(pool: &SqlitePool, stripe_subscription_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM billing_subscriptions
        WHERE stripe_subscription_id = ?
        "#,
    )
    .bind(stripe_subscription_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Upsert a one-time payment by its provider payment-intent id.
///
/// Conflict resolution updates: client_id, status, amount, currency.
pub async fn upsert_payment(pool: &SqlitePool, payment: &Payment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO billing_payments
            (stripe_payment_intent_id, client_id, status, amount, currency)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (stripe_payment_intent_id) DO UPDATE SET
            client_id = excluded.client_id,
            status = excluded.status,
            amount = excluded.amount,
            currency = excluded.currency
        "#,
    )
    .bind(&payment.stripe_payment_intent_id)
    .bind(&payment.client_id)
    .bind(&payment.status)
    .bind(payment.amount)
    .bind(&payment.currency)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the tenant has any one-time payment in one of the given
/// statuses. A later declined intent never shadows an earlier settled one.
pub async fn payment_in_status_exists(
    pool: &SqlitePool,
    client_id: &str,
    statuses: &[&str],
) -> Result<bool> {
    if statuses.is_empty() {
        return Ok(false);
    }

    let placeholders = vec!["?"; statuses.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM billing_payments \
         WHERE client_id = ? AND status IN ({placeholders})"
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(client_id);
    for status in statuses {
        query = query.bind(*status);
    }
    let count = query.fetch_one(pool).await?;

    Ok(count > 0)
}

/// Get a payment by its provider payment-intent id.
pub async fn get_payment(
    pool: &SqlitePool,
    stripe_payment_intent_id: &str,
) -> Result<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT stripe_payment_intent_id, client_id, status, amount, currency
        FROM billing_payments
        WHERE stripe_payment_intent_id = ?
        "#,
    )
    .bind(stripe_payment_intent_id)
    .fetch_optional(pool)
    .await?;

    Ok(payment)
}
