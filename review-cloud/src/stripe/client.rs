//! reqwest-backed Stripe client

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::types::{CheckoutSession, Customer, ErrorEnvelope, List, PortalSession, Subscription};
use super::{CheckoutParams, StripeApi, StripeError};

const API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe client authenticating with the account's secret key
#[derive(Clone)]
pub struct HttpStripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl HttpStripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: API_BASE.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Decode a success body, or turn Stripe's error envelope into `StripeError::Api`
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, StripeError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let message = resp
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| status.to_string());
        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl StripeApi for HttpStripeClient {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, StripeError> {
        let resp = self
            .http
            .post(self.url("/customers"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("email", email), ("metadata[userId]", user_id)])
            .send()
            .await?;

        let customer: Customer = Self::decode(resp).await?;
        Ok(customer.id)
    }

    async fn delete_customer(&self, customer_id: &str) -> Result<(), StripeError> {
        let resp = self
            .http
            .delete(self.url(&format!("/customers/{customer_id}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let _: serde_json::Value = Self::decode(resp).await?;
        Ok(())
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutParams<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        let resp = self
            .http
            .post(self.url("/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("customer", params.customer_id),
                ("payment_method_types[0]", "card"),
                ("line_items[0][price]", params.price_id),
                ("line_items[0][quantity]", "1"),
                ("mode", params.mode.as_db()),
                ("success_url", params.success_url),
                ("cancel_url", params.cancel_url),
            ])
            .send()
            .await?;

        let session: CheckoutSession = Self::decode(resp).await?;
        if session.url.is_none() {
            return Err(StripeError::MissingField("checkout session url"));
        }
        Ok(session)
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, StripeError> {
        let resp = self
            .http
            .post(self.url("/billing_portal/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await?;

        let session: PortalSession = Self::decode(resp).await?;
        Ok(session.url)
    }

    async fn latest_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, StripeError> {
        let resp = self
            .http
            .get(self.url("/subscriptions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[
                ("customer", customer_id),
                ("limit", "1"),
                ("status", "all"),
                ("expand[]", "data.default_payment_method"),
            ])
            .send()
            .await?;

        let list: List<Subscription> = Self::decode(resp).await?;
        Ok(list.data.into_iter().next())
    }
}
