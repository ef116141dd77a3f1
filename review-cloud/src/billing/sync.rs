//! Subscription sync: Stripe state -> subscription record + profile tier

use std::sync::Arc;

use shared::models::{SubscriptionStatus, Transition};
use uuid::Uuid;

use super::plans::PlanCatalog;
use crate::db::{ProfileTier, Store, SubscriptionRecord, SyncOutcome, SyncWrite};
use crate::stripe::{StripeApi, StripeError, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Stripe(#[from] StripeError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// What Stripe reported for a customer, flattened into record fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub record: SubscriptionRecord,
    /// Trial end (unix seconds), when Stripe reports one
    pub trial_end: Option<i64>,
}

impl SubscriptionSnapshot {
    /// No subscription at all reads as `canceled` with every other field empty.
    pub fn new(customer_id: &str, subscription: Option<&Subscription>) -> Self {
        let Some(sub) = subscription else {
            return Self {
                record: SubscriptionRecord {
                    status: SubscriptionStatus::Canceled,
                    ..SubscriptionRecord::not_started(customer_id)
                },
                trial_end: None,
            };
        };

        let status = SubscriptionStatus::from_db(&sub.status).unwrap_or_else(|| {
            tracing::warn!(status = %sub.status, customer_id, "Unknown Stripe subscription status, treating as canceled");
            SubscriptionStatus::Canceled
        });
        let card = sub.card();

        Self {
            record: SubscriptionRecord {
                customer_id: customer_id.to_string(),
                subscription_id: Some(sub.id.clone()),
                price_id: sub.price_id().map(str::to_string),
                status,
                current_period_start: sub.period_start(),
                current_period_end: sub.period_end(),
                cancel_at_period_end: sub.cancel_at_period_end,
                payment_method_brand: card.and_then(|c| c.brand.clone()),
                payment_method_last4: card.and_then(|c| c.last4.clone()),
            },
            trial_end: sub.trial_end,
        }
    }

    /// Pair the record with the profile fields it implies
    pub fn into_write(self, user_id: Uuid, plans: &PlanCatalog, event_at: i64) -> SyncWrite {
        let status = self.record.status;
        let tier = plans.resolve_tier(status, self.record.price_id.as_deref());
        SyncWrite {
            profile: ProfileTier {
                user_id,
                tier,
                is_active_subscription: status.is_active(),
                trial_ends_at: self.trial_end.and_then(shared::util::from_unix_secs),
            },
            record: self.record,
            event_at,
        }
    }
}

/// Keeps stored subscription state in step with Stripe
pub struct Reconciler {
    store: Arc<dyn Store>,
    stripe: Arc<dyn StripeApi>,
    plans: Arc<PlanCatalog>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, stripe: Arc<dyn StripeApi>, plans: Arc<PlanCatalog>) -> Self {
        Self {
            store,
            stripe,
            plans,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Fetch the customer's latest subscription and persist it.
    ///
    /// `event_at` orders concurrent and redelivered events: a sync carrying an
    /// older timestamp than the stored one is reported as `Stale` and not written.
    pub async fn sync_subscription(
        &self,
        customer_id: &str,
        user_id: Uuid,
        event_at: i64,
    ) -> Result<SyncOutcome, SyncError> {
        let subscription = self
            .stripe
            .latest_subscription(customer_id)
            .await
            .inspect_err(|e| tracing::error!(customer_id, error = %e, "Failed to fetch subscription from Stripe"))?;

        let write = SubscriptionSnapshot::new(customer_id, subscription.as_ref())
            .into_write(user_id, &self.plans, event_at);
        let status = write.record.status;
        let tier = write.profile.tier;

        let outcome = self
            .store
            .apply_sync(&write)
            .await
            .inspect_err(|e| tracing::error!(customer_id, %user_id, error = %e, "Failed to persist subscription sync"))?;

        match outcome {
            SyncOutcome::Applied { previous_status } => {
                if let Some(previous) = previous_status
                    && previous.transition_to(status) == Transition::Unexpected
                {
                    tracing::warn!(
                        customer_id,
                        from = %previous,
                        to = %status,
                        "Unexpected subscription status transition"
                    );
                }
                tracing::info!(
                    customer_id,
                    %user_id,
                    status = %status,
                    tier = %tier,
                    "Synced subscription"
                );
            }
            SyncOutcome::Stale { stored_event_at } => {
                tracing::info!(
                    customer_id,
                    event_at,
                    stored_event_at,
                    "Skipped stale subscription sync"
                );
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) fn test_reconciler() -> (
    Reconciler,
    Arc<crate::db::memory::MemoryStore>,
    Arc<crate::stripe::mock::MockStripe>,
) {
    let store = Arc::new(crate::db::memory::MemoryStore::new());
    let stripe = Arc::new(crate::stripe::mock::MockStripe::new());
    let reconciler = Reconciler::new(
        store.clone(),
        stripe.clone(),
        Arc::new(super::plans::test_catalog()),
    );
    (reconciler, store, stripe)
}
