//! Database access layer
//!
//! Each table has a module of free functions over `&PgPool`; [`PgStore`]
//! bundles them behind the [`Store`] trait so handlers and the billing
//! reconciler can run against an in-memory store in tests.

pub mod customers;
#[cfg(test)]
pub mod memory;
pub mod profiles;
pub mod qr_codes;
pub mod subscriptions;
pub mod webhook_events;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{
    DashboardStats, Profile, ProfileUpdate, QrCode, QrCodeUpdate, QrStyle, SubscriptionStatus,
    Tier,
};
use sqlx::PgPool;
use uuid::Uuid;

pub type DbResult<T> = Result<T, sqlx::Error>;

/// Subscription record as persisted, keyed by Stripe customer id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub payment_method_brand: Option<String>,
    pub payment_method_last4: Option<String>,
}

impl SubscriptionRecord {
    /// Placeholder written when a customer starts a subscription checkout
    pub fn not_started(customer_id: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            subscription_id: None,
            price_id: None,
            status: SubscriptionStatus::NotStarted,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            payment_method_brand: None,
            payment_method_last4: None,
        }
    }
}

/// Profile fields derived from the subscription record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTier {
    pub user_id: Uuid,
    pub tier: Tier,
    pub is_active_subscription: bool,
    /// Only overwrites the stored value when present
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Both halves of a subscription sync, written in one transaction
#[derive(Debug, Clone)]
pub struct SyncWrite {
    pub record: SubscriptionRecord,
    pub profile: ProfileTier,
    /// Provider event timestamp (unix seconds) used for ordering
    pub event_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied {
        previous_status: Option<SubscriptionStatus>,
    },
    /// A newer event was already applied; nothing was written
    Stale { stored_event_at: i64 },
}

/// QR code row to insert
#[derive(Debug, Clone)]
pub struct NewQrCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub google_business_url: String,
    pub short_code: String,
    pub style: QrStyle,
}

/// Request metadata recorded with each scan
#[derive(Debug, Clone, Default)]
pub struct ScanInfo {
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Persistence operations used by the API and the billing reconciler
#[async_trait]
pub trait Store: Send + Sync {
    // Customers

    async fn find_user_by_customer(&self, customer_id: &str) -> DbResult<Option<Uuid>>;

    async fn find_customer_by_user(&self, user_id: Uuid) -> DbResult<Option<String>>;

    /// Store the customer mapping and, if `with_placeholder`, a `not_started`
    /// subscription record. Either both are written or neither is.
    async fn link_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
        with_placeholder: bool,
    ) -> DbResult<()>;

    // Subscriptions

    /// Insert a `not_started` record unless one already exists
    async fn ensure_subscription_placeholder(&self, customer_id: &str) -> DbResult<()>;

    async fn get_subscription(&self, customer_id: &str) -> DbResult<Option<SubscriptionRecord>>;

    /// Upsert the record and update the profile atomically, rejecting stale events
    async fn apply_sync(&self, write: &SyncWrite) -> DbResult<SyncOutcome>;

    // Profiles

    /// Fetch the profile, creating it on first access
    async fn ensure_profile(&self, user_id: Uuid, email: &str) -> DbResult<Profile>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> DbResult<Option<Profile>>;

    // QR codes

    async fn list_qr_codes(&self, user_id: Uuid) -> DbResult<Vec<QrCode>>;

    /// Returns `None` when the short code is already taken
    async fn insert_qr_code(&self, qr: &NewQrCode) -> DbResult<Option<QrCode>>;

    async fn update_qr_code(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &QrCodeUpdate,
    ) -> DbResult<Option<QrCode>>;

    async fn delete_qr_code(&self, user_id: Uuid, id: Uuid) -> DbResult<bool>;

    async fn dashboard(&self, user_id: Uuid) -> DbResult<DashboardStats>;

    /// Count a scan of `short_code`, returning the destination URL
    async fn record_scan(&self, short_code: &str, scan: &ScanInfo) -> DbResult<Option<String>>;

    // Webhook idempotency

    /// Returns `false` if the event id was already recorded
    async fn record_webhook_event(&self, event_id: &str, event_type: &str) -> DbResult<bool>;

    /// Drop an event id so a provider retry is processed again
    async fn forget_webhook_event(&self, event_id: &str) -> DbResult<()>;
}

/// PostgreSQL-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_customer(&self, customer_id: &str) -> DbResult<Option<Uuid>> {
        customers::find_user_by_customer(&self.pool, customer_id).await
    }

    async fn find_customer_by_user(&self, user_id: Uuid) -> DbResult<Option<String>> {
        customers::find_customer_by_user(&self.pool, user_id).await
    }

    async fn link_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
        with_placeholder: bool,
    ) -> DbResult<()> {
        customers::link(&self.pool, user_id, customer_id, with_placeholder).await
    }

    async fn ensure_subscription_placeholder(&self, customer_id: &str) -> DbResult<()> {
        subscriptions::create_placeholder(&self.pool, customer_id).await
    }

    async fn get_subscription(&self, customer_id: &str) -> DbResult<Option<SubscriptionRecord>> {
        subscriptions::find_by_customer(&self.pool, customer_id).await
    }

    async fn apply_sync(&self, write: &SyncWrite) -> DbResult<SyncOutcome> {
        subscriptions::apply_sync(&self.pool, write).await
    }

    async fn ensure_profile(&self, user_id: Uuid, email: &str) -> DbResult<Profile> {
        profiles::ensure(&self.pool, user_id, email).await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> DbResult<Option<Profile>> {
        profiles::update(&self.pool, user_id, update).await
    }

    async fn list_qr_codes(&self, user_id: Uuid) -> DbResult<Vec<QrCode>> {
        qr_codes::list_by_user(&self.pool, user_id).await
    }

    async fn insert_qr_code(&self, qr: &NewQrCode) -> DbResult<Option<QrCode>> {
        qr_codes::create(&self.pool, qr).await
    }

    async fn update_qr_code(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &QrCodeUpdate,
    ) -> DbResult<Option<QrCode>> {
        qr_codes::update(&self.pool, user_id, id, update).await
    }

    async fn delete_qr_code(&self, user_id: Uuid, id: Uuid) -> DbResult<bool> {
        qr_codes::delete(&self.pool, user_id, id).await
    }

    async fn dashboard(&self, user_id: Uuid) -> DbResult<DashboardStats> {
        qr_codes::dashboard(&self.pool, user_id).await
    }

    async fn record_scan(&self, short_code: &str, scan: &ScanInfo) -> DbResult<Option<String>> {
        qr_codes::record_scan(&self.pool, short_code, scan).await
    }

    async fn record_webhook_event(&self, event_id: &str, event_type: &str) -> DbResult<bool> {
        webhook_events::record(&self.pool, event_id, event_type).await
    }

    async fn forget_webhook_event(&self, event_id: &str) -> DbResult<()> {
        webhook_events::forget(&self.pool, event_id).await
    }
}
