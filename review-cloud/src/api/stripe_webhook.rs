//! Stripe webhook handler
//!
//! POST /stripe/webhook — raw body, verified against the Stripe-Signature header

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::billing::{self, DispatchOutcome, StripeEvent};
use crate::state::AppState;
use crate::stripe;

/// Handle incoming Stripe webhook events.
///
/// Returns 200 for processed, duplicate and ignored events (including events
/// whose object cannot be decoded, since a retry would carry the same body),
/// 400 for unverified or unparsable requests, and 500 when the sync failed so
/// Stripe retries.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(sig_header) => {
            if let Err(e) =
                stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
            {
                tracing::warn!(error = e, "Webhook signature verification failed");
                return StatusCode::BAD_REQUEST;
            }
        }
        None if state.allow_unsigned_webhooks => {
            tracing::warn!("Accepting unsigned webhook (ALLOW_UNSIGNED_WEBHOOKS is set)");
        }
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    }

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let payload = match event.payload() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(%e, event_id = %event.id, event_type = %event.event_type, "Malformed webhook event object, acknowledging");
            return StatusCode::OK;
        }
    };

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received Stripe webhook");

    // Record first so concurrent redeliveries are processed once
    match state
        .store
        .record_webhook_event(&event.id, &event.event_type)
        .await
    {
        Ok(false) => {
            tracing::info!(event_id = %event.id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {}
    }

    match billing::handle_event(&state.reconciler, &event, &payload).await {
        Ok(outcome) => {
            if let DispatchOutcome::Synced(sync) = outcome {
                tracing::debug!(event_id = %event.id, ?sync, "Webhook event processed");
            }
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(event_id = %event.id, error = %e, "Webhook processing failed");
            // Let the retry through the idempotency check
            if let Err(e) = state.store.forget_webhook_event(&event.id).await {
                tracing::error!(event_id = %event.id, %e, "Failed to release webhook event id");
            }
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
