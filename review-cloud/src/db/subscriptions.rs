use shared::models::SubscriptionStatus;
use sqlx::{PgExecutor, PgPool};

use super::{SubscriptionRecord, SyncOutcome, SyncWrite};

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    customer_id: String,
    subscription_id: Option<String>,
    price_id: Option<String>,
    status: String,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    cancel_at_period_end: bool,
    payment_method_brand: Option<String>,
    payment_method_last4: Option<String>,
}

impl From<SubscriptionRow> for SubscriptionRecord {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            status: SubscriptionStatus::from_db(&row.status).unwrap_or_else(|| {
                tracing::warn!(status = %row.status, customer_id = %row.customer_id, "Unknown stored subscription status");
                SubscriptionStatus::Canceled
            }),
            customer_id: row.customer_id,
            subscription_id: row.subscription_id,
            price_id: row.price_id,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            payment_method_brand: row.payment_method_brand,
            payment_method_last4: row.payment_method_last4,
        }
    }
}

/// Insert a `not_started` row unless the customer already has one
pub async fn create_placeholder<'e>(
    executor: impl PgExecutor<'e>,
    customer_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO stripe_subscriptions (customer_id, status)
         VALUES ($1, 'not_started')
         ON CONFLICT (customer_id) DO NOTHING",
    )
    .bind(customer_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_customer(
    pool: &PgPool,
    customer_id: &str,
) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
    let row: Option<SubscriptionRow> = sqlx::query_as(
        "SELECT customer_id, subscription_id, price_id, status, current_period_start,
            current_period_end, cancel_at_period_end, payment_method_brand, payment_method_last4
         FROM stripe_subscriptions WHERE customer_id = $1",
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Write the subscription record and the profile tier fields in one transaction.
///
/// A transaction-scoped advisory lock on the customer id serializes concurrent
/// syncs for the same customer; an event older than the stored
/// `last_event_at` leaves both tables untouched.
pub async fn apply_sync(pool: &PgPool, write: &SyncWrite) -> Result<SyncOutcome, sqlx::Error> {
    let record = &write.record;
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&record.customer_id)
        .execute(&mut *tx)
        .await?;

    let current: Option<(String, Option<i64>)> = sqlx::query_as(
        "SELECT status, last_event_at FROM stripe_subscriptions WHERE customer_id = $1",
    )
    .bind(&record.customer_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((_, Some(stored_event_at))) = &current
        && *stored_event_at > write.event_at
    {
        tx.rollback().await?;
        return Ok(SyncOutcome::Stale {
            stored_event_at: *stored_event_at,
        });
    }

    sqlx::query(
        "INSERT INTO stripe_subscriptions (
            customer_id, subscription_id, price_id, status, current_period_start,
            current_period_end, cancel_at_period_end, payment_method_brand,
            payment_method_last4, last_event_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
         ON CONFLICT (customer_id) DO UPDATE SET
            subscription_id = $2, price_id = $3, status = $4, current_period_start = $5,
            current_period_end = $6, cancel_at_period_end = $7, payment_method_brand = $8,
            payment_method_last4 = $9, last_event_at = $10, updated_at = now()",
    )
    .bind(&record.customer_id)
    .bind(&record.subscription_id)
    .bind(&record.price_id)
    .bind(record.status.as_db())
    .bind(record.current_period_start)
    .bind(record.current_period_end)
    .bind(record.cancel_at_period_end)
    .bind(&record.payment_method_brand)
    .bind(&record.payment_method_last4)
    .bind(write.event_at)
    .execute(&mut *tx)
    .await?;

    let profile = &write.profile;
    let updated = sqlx::query(
        "UPDATE profiles SET
            subscription_tier = $2,
            is_active_subscription = $3,
            trial_ends_at = COALESCE($4, trial_ends_at),
            updated_at = now()
         WHERE id = $1",
    )
    .bind(profile.user_id)
    .bind(profile.tier.as_db())
    .bind(profile.is_active_subscription)
    .bind(profile.trial_ends_at)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tracing::warn!(user_id = %profile.user_id, "No profile row for subscription sync");
    }

    tx.commit().await?;

    Ok(SyncOutcome::Applied {
        previous_status: current.and_then(|(status, _)| SubscriptionStatus::from_db(&status)),
    })
}
