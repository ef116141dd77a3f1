//! In-process Stripe double for tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::types::{CheckoutSession, Subscription};
use super::{CheckoutParams, StripeApi, StripeError};

#[derive(Default)]
pub struct MockStripe {
    /// customer id -> latest subscription
    pub subscriptions: Mutex<HashMap<String, Subscription>>,
    pub created_customers: Mutex<Vec<(String, String)>>,
    pub deleted_customers: Mutex<Vec<String>>,
    pub checkout_requests: Mutex<Vec<(String, String, String)>>,
    pub fail_subscription_fetch: std::sync::atomic::AtomicBool,
    next_id: AtomicUsize,
}

impl MockStripe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the subscription Stripe would report for `customer_id`
    pub fn set_subscription(&self, customer_id: &str, value: serde_json::Value) {
        let sub: Subscription = serde_json::from_value(value).unwrap();
        self.subscriptions
            .lock()
            .unwrap()
            .insert(customer_id.to_string(), sub);
    }
}

/// Subscription JSON in the shape Stripe returns it
pub fn subscription_json(status: &str, price_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "sub_test",
        "status": status,
        "items": { "data": [ { "price": { "id": price_id } } ] },
        "current_period_start": 1_700_000_000,
        "current_period_end": 1_702_592_000,
        "cancel_at_period_end": false,
        "trial_end": null,
        "default_payment_method": {
            "id": "pm_test",
            "card": { "brand": "visa", "last4": "4242" }
        }
    })
}

#[async_trait]
impl StripeApi for MockStripe {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, StripeError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("cus_mock_{n}");
        self.created_customers
            .lock()
            .unwrap()
            .push((email.to_string(), user_id.to_string()));
        Ok(id)
    }

    async fn delete_customer(&self, customer_id: &str) -> Result<(), StripeError> {
        self.deleted_customers
            .lock()
            .unwrap()
            .push(customer_id.to_string());
        Ok(())
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutParams<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        self.checkout_requests.lock().unwrap().push((
            params.customer_id.to_string(),
            params.price_id.to_string(),
            params.mode.as_db().to_string(),
        ));
        Ok(CheckoutSession {
            id: "cs_test_1".to_string(),
            url: Some("https://checkout.stripe.com/c/pay/cs_test_1".to_string()),
        })
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> Result<String, StripeError> {
        Ok(format!("https://billing.stripe.com/p/session/{customer_id}"))
    }

    async fn latest_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, StripeError> {
        if self.fail_subscription_fetch.load(Ordering::SeqCst) {
            return Err(StripeError::Api {
                status: 500,
                message: "mock outage".to_string(),
            });
        }
        Ok(self.subscriptions.lock().unwrap().get(customer_id).cloned())
    }
}
