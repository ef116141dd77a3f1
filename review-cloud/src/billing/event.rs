//! Stripe event envelope and typed payloads
//!
//! The envelope is decoded once; [`StripeEvent::payload`] then turns
//! `data.object` into the variant matching the event type, so dispatch never
//! reaches into raw JSON.

use serde::Deserialize;
use shared::models::BillingMode;

use crate::stripe::types::{Customer, Expandable, StripeObject};

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix seconds at which Stripe created the event
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Reference to an object whose fields we never read
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

impl StripeObject for ObjectRef {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: Option<Expandable<Customer>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: Option<String>,
    pub customer: Option<Expandable<Customer>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub mode: Option<String>,
    pub customer: Option<Expandable<Customer>>,
    pub subscription: Option<Expandable<ObjectRef>>,
}

impl CheckoutSessionObject {
    /// A completed subscription checkout that produced a subscription
    pub fn started_subscription(&self) -> bool {
        self.mode.as_deref().and_then(BillingMode::from_db) == Some(BillingMode::Subscription)
            && self.subscription.is_some()
    }
}

/// Event payload, one variant per event family this service reacts to
#[derive(Debug, Clone)]
pub enum EventPayload {
    CustomerCreated(Customer),
    Subscription(SubscriptionChange, SubscriptionObject),
    /// `invoice.payment_succeeded` or `invoice.paid`
    InvoicePaid(InvoiceObject),
    CheckoutCompleted(CheckoutSessionObject),
    Unhandled,
}

impl EventPayload {
    /// Stripe customer the event concerns, if it names one
    pub fn customer_id(&self) -> Option<&str> {
        let id = match self {
            EventPayload::CustomerCreated(customer) => Some(customer.id.as_str()),
            EventPayload::Subscription(_, sub) => sub.customer.as_ref().map(Expandable::id),
            EventPayload::InvoicePaid(invoice) => invoice.customer.as_ref().map(Expandable::id),
            EventPayload::CheckoutCompleted(session) => {
                session.customer.as_ref().map(Expandable::id)
            }
            EventPayload::Unhandled => None,
        };
        id.filter(|id| !id.is_empty())
    }

    /// Id of the Stripe object carried by the event (subscription, invoice, ...)
    pub fn object_id(&self) -> Option<&str> {
        match self {
            EventPayload::CustomerCreated(customer) => Some(&customer.id),
            EventPayload::Subscription(_, sub) => Some(&sub.id),
            EventPayload::InvoicePaid(invoice) => invoice.id.as_deref(),
            EventPayload::CheckoutCompleted(session) => Some(&session.id),
            EventPayload::Unhandled => None,
        }
    }
}

impl StripeEvent {
    /// Decode `data.object` according to the event type
    pub fn payload(&self) -> Result<EventPayload, serde_json::Error> {
        let object = || self.data.object.clone();
        let payload = match self.event_type.as_str() {
            "customer.created" => EventPayload::CustomerCreated(serde_json::from_value(object())?),
            "customer.subscription.created" => {
                EventPayload::Subscription(SubscriptionChange::Created, serde_json::from_value(object())?)
            }
            "customer.subscription.updated" => {
                EventPayload::Subscription(SubscriptionChange::Updated, serde_json::from_value(object())?)
            }
            "customer.subscription.deleted" => {
                EventPayload::Subscription(SubscriptionChange::Deleted, serde_json::from_value(object())?)
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                EventPayload::InvoicePaid(serde_json::from_value(object())?)
            }
            "checkout.session.completed" => {
                EventPayload::CheckoutCompleted(serde_json::from_value(object())?)
            }
            _ => EventPayload::Unhandled,
        };
        Ok(payload)
    }
}

#[cfg(test)]
pub(crate) fn event_json(event_type: &str, created: i64, object: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{event_type}_{created}"),
        "object": "event",
        "type": event_type,
        "created": created,
        "data": { "object": object },
    }))
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(event_type: &str, object: serde_json::Value) -> EventPayload {
        let event: StripeEvent =
            serde_json::from_slice(&event_json(event_type, 1_700_000_000, object)).unwrap();
        event.payload().unwrap()
    }

    #[test]
    fn test_envelope_fields() {
        let event: StripeEvent = serde_json::from_slice(&event_json(
            "invoice.paid",
            1_700_000_123,
            json!({ "id": "in_1", "customer": "cus_1" }),
        ))
        .unwrap();
        assert_eq!(event.id, "evt_invoice.paid_1700000123");
        assert_eq!(event.event_type, "invoice.paid");
        assert_eq!(event.created, 1_700_000_123);
    }

    #[test]
    fn test_customer_id_from_string_reference() {
        let payload = decode(
            "customer.subscription.updated",
            json!({ "id": "sub_1", "customer": "cus_A" }),
        );
        assert!(matches!(
            payload,
            EventPayload::Subscription(SubscriptionChange::Updated, _)
        ));
        assert_eq!(payload.customer_id(), Some("cus_A"));
    }

    #[test]
    fn test_customer_id_from_expanded_object() {
        let payload = decode(
            "invoice.payment_succeeded",
            json!({ "id": "in_1", "customer": { "id": "cus_B", "email": "a@b.c" } }),
        );
        assert!(matches!(payload, EventPayload::InvoicePaid(_)));
        assert_eq!(payload.customer_id(), Some("cus_B"));
    }

    #[test]
    fn test_customer_created_uses_object_id() {
        let payload = decode("customer.created", json!({ "id": "cus_C", "email": null }));
        assert!(matches!(payload, EventPayload::CustomerCreated(_)));
        assert_eq!(payload.customer_id(), Some("cus_C"));
    }

    #[test]
    fn test_object_id_per_payload() {
        let payload = decode(
            "customer.subscription.deleted",
            json!({ "id": "sub_7", "customer": "cus_A" }),
        );
        assert!(matches!(
            payload,
            EventPayload::Subscription(SubscriptionChange::Deleted, _)
        ));
        assert_eq!(payload.object_id(), Some("sub_7"));

        let payload = decode("invoice.paid", json!({ "customer": "cus_A" }));
        assert_eq!(payload.object_id(), None);

        let payload = decode(
            "checkout.session.completed",
            json!({ "id": "cs_7", "mode": "payment", "customer": "cus_A" }),
        );
        assert_eq!(payload.object_id(), Some("cs_7"));
    }

    #[test]
    fn test_missing_customer() {
        let payload = decode("invoice.paid", json!({ "id": "in_2", "customer": null }));
        assert_eq!(payload.customer_id(), None);

        let payload = decode("invoice.paid", json!({ "id": "in_3", "customer": "" }));
        assert_eq!(payload.customer_id(), None);
    }

    #[test]
    fn test_unknown_type_is_unhandled() {
        let payload = decode("charge.refunded", json!({ "id": "ch_1", "customer": "cus_D" }));
        assert!(matches!(payload, EventPayload::Unhandled));
        assert_eq!(payload.customer_id(), None);
    }

    #[test]
    fn test_checkout_started_subscription() {
        let EventPayload::CheckoutCompleted(session) = decode(
            "checkout.session.completed",
            json!({ "id": "cs_1", "mode": "subscription", "customer": "cus_E", "subscription": "sub_9" }),
        ) else {
            panic!("expected checkout payload");
        };
        assert!(session.started_subscription());

        let EventPayload::CheckoutCompleted(session) = decode(
            "checkout.session.completed",
            json!({ "id": "cs_2", "mode": "payment", "customer": "cus_E", "subscription": null }),
        ) else {
            panic!("expected checkout payload");
        };
        assert!(!session.started_subscription());
    }

    #[test]
    fn test_malformed_object_is_an_error() {
        let event: StripeEvent = serde_json::from_slice(&event_json(
            "customer.subscription.deleted",
            0,
            json!({ "customer": "cus_F" }),
        ))
        .unwrap();
        assert!(event.payload().is_err());
    }
}
