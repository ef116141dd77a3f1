//! Route decoded Stripe events to the subscription sync

use super::event::{EventPayload, StripeEvent};
use super::sync::{Reconciler, SyncError};
use crate::db::SyncOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Synced(SyncOutcome),
    /// Event type or shape this service does not act on
    Ignored,
    /// Event names no customer
    NoCustomer,
    /// Customer is not linked to any user
    UnmappedCustomer(String),
}

/// Handle one verified event.
///
/// Only sync failures are returned as errors; events that cannot be attributed
/// to a user are logged and reported as an outcome.
pub async fn handle_event(
    reconciler: &Reconciler,
    event: &StripeEvent,
    payload: &EventPayload,
) -> Result<DispatchOutcome, SyncError> {
    let wants_sync = match payload {
        EventPayload::Subscription(..) | EventPayload::InvoicePaid(_) => true,
        EventPayload::CheckoutCompleted(session) => session.started_subscription(),
        EventPayload::CustomerCreated(_) | EventPayload::Unhandled => false,
    };

    let Some(customer_id) = payload.customer_id() else {
        if matches!(payload, EventPayload::Unhandled) {
            tracing::debug!(event_type = %event.event_type, "Unhandled webhook event type");
            return Ok(DispatchOutcome::Ignored);
        }
        tracing::warn!(event_id = %event.id, event_type = %event.event_type, "No customer id in event");
        return Ok(DispatchOutcome::NoCustomer);
    };

    let user_id = match reconciler.store().find_user_by_customer(customer_id).await? {
        Some(user_id) => user_id,
        None => {
            tracing::warn!(customer_id, event_type = %event.event_type, "No user for Stripe customer");
            return Ok(DispatchOutcome::UnmappedCustomer(customer_id.to_string()));
        }
    };

    let object_id = payload.object_id().unwrap_or_default();
    if !wants_sync {
        tracing::info!(customer_id, object_id, event_type = %event.event_type, "Ignoring webhook event");
        return Ok(DispatchOutcome::Ignored);
    }

    match payload {
        EventPayload::Subscription(change, _) => {
            tracing::info!(customer_id, subscription_id = object_id, ?change, "Subscription changed")
        }
        _ => tracing::info!(customer_id, object_id, event_type = %event.event_type, "Syncing subscription"),
    }

    let outcome = reconciler
        .sync_subscription(customer_id, user_id, event.created)
        .await?;
    Ok(DispatchOutcome::Synced(outcome))
}
