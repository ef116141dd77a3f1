//! Stripe customer <-> user mapping

use sqlx::PgPool;
use uuid::Uuid;

use super::subscriptions;

pub async fn find_user_by_customer(
    pool: &PgPool,
    customer_id: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT user_id FROM stripe_customers WHERE customer_id = $1",
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

pub async fn find_customer_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT customer_id FROM stripe_customers WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Insert the mapping, plus a `not_started` subscription row when the
/// customer is starting a subscription checkout. Both rows commit together.
pub async fn link(
    pool: &PgPool,
    user_id: Uuid,
    customer_id: &str,
    with_placeholder: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO stripe_customers (user_id, customer_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

    if with_placeholder {
        subscriptions::create_placeholder(&mut *tx, customer_id).await?;
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::profiles;
    use shared::models::SubscriptionStatus;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL with Postgres server"]
    async fn link_writes_mapping_and_placeholder(pool: PgPool) {
        let user_id = Uuid::new_v4();
        profiles::ensure(&pool, user_id, "pg@example.com").await.unwrap();

        link(&pool, user_id, "cus_link", true).await.unwrap();

        assert_eq!(
            find_customer_by_user(&pool, user_id).await.unwrap().as_deref(),
            Some("cus_link")
        );
        assert_eq!(find_user_by_customer(&pool, "cus_link").await.unwrap(), Some(user_id));
        let record = subscriptions::find_by_customer(&pool, "cus_link")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SubscriptionStatus::NotStarted);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL with Postgres server"]
    async fn failed_link_writes_nothing(pool: PgPool) {
        let user_id = Uuid::new_v4();
        profiles::ensure(&pool, user_id, "pg@example.com").await.unwrap();
        link(&pool, user_id, "cus_first", false).await.unwrap();

        // user_id is unique, so the second mapping fails and its placeholder rolls back
        assert!(link(&pool, user_id, "cus_second", true).await.is_err());
        assert!(
            subscriptions::find_by_customer(&pool, "cus_second")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(find_user_by_customer(&pool, "cus_second").await.unwrap(), None);
    }
}
