//! User profiles
//!
//! Tier fields are only written by the subscription sync
//! (`subscriptions::apply_sync`); nothing here touches them.

use chrono::{DateTime, Utc};
use shared::models::{Profile, ProfileUpdate, Tier};
use sqlx::PgPool;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, email, company_name, google_business_url, subscription_tier,
    is_active_subscription, trial_ends_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    company_name: Option<String>,
    google_business_url: Option<String>,
    subscription_tier: String,
    is_active_subscription: bool,
    trial_ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            company_name: row.company_name,
            google_business_url: row.google_business_url,
            subscription_tier: Tier::from_db(&row.subscription_tier).unwrap_or_default(),
            is_active_subscription: row.is_active_subscription,
            trial_ends_at: row.trial_ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn ensure(pool: &PgPool, user_id: Uuid, email: &str) -> Result<Profile, sqlx::Error> {
    sqlx::query(
        "INSERT INTO profiles (id, email) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
    )
    .bind(user_id)
    .bind(email)
    .execute(pool)
    .await?;

    let row: ProfileRow =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(row.into())
}

/// Patch the user-editable fields; an empty string clears a field
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<Profile>, sqlx::Error> {
    let row: Option<ProfileRow> = sqlx::query_as(&format!(
        "UPDATE profiles SET
            company_name = NULLIF(COALESCE($2, company_name), ''),
            google_business_url = NULLIF(COALESCE($3, google_business_url), ''),
            updated_at = now()
         WHERE id = $1
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&update.company_name)
    .bind(&update.google_business_url)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}
