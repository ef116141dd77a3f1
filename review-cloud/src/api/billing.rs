//! Billing endpoints: plan list, checkout session, billing portal, subscription view

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, header};
use axum::{Extension, Json, extract::State};
use serde::Serialize;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{BillingMode, SubscriptionView, is_http_url};

use crate::auth::UserIdentity;
use crate::billing::Plan;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::stripe::CheckoutParams;

use super::ApiResult;

/// GET /api/plans
pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<Plan>> {
    Json(state.plans.plans().to_vec())
}

/// Validated checkout request
#[derive(Debug)]
struct CheckoutRequest<'a> {
    price_id: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
    mode: BillingMode,
}

fn required_string<'a>(body: &'a Value, param: &str) -> Result<&'a str, AppError> {
    match body.get(param) {
        None | Some(Value::Null) => Err(AppError::validation(format!(
            "Missing required parameter {param}"
        ))),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(AppError::validation(format!(
            "Expected parameter {param} to be a string got {other}"
        ))),
    }
}

impl<'a> CheckoutRequest<'a> {
    fn parse(body: &'a Value) -> Result<Self, AppError> {
        let price_id = required_string(body, "price_id")?;
        let success_url = required_string(body, "success_url")?;
        let cancel_url = required_string(body, "cancel_url")?;
        let mode = body
            .get("mode")
            .and_then(Value::as_str)
            .and_then(BillingMode::from_db)
            .ok_or_else(|| {
                AppError::validation("Expected parameter mode to be one of payment, subscription")
            })?;

        for (param, url) in [("success_url", success_url), ("cancel_url", cancel_url)] {
            if !is_http_url(url) {
                return Err(AppError::validation(format!(
                    "Expected parameter {param} to be an http(s) URL"
                )));
            }
        }

        Ok(Self {
            price_id,
            success_url,
            cancel_url,
            mode,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// POST /api/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<CheckoutResponse> {
    let Json(body) = body.map_err(|e| AppError::validation(e.body_text()))?;
    let req = CheckoutRequest::parse(&body)?;

    if req.mode == BillingMode::Subscription && state.plans.by_price_id(req.price_id).is_none() {
        return Err(AppError::new(ErrorCode::PlanNotFound)
            .with_detail("price_id", req.price_id)
            .into());
    }

    // Customer mapping references the profile row
    state
        .store
        .ensure_profile(identity.user_id, &identity.email)
        .await?;

    let customer_id = match state.store.find_customer_by_user(identity.user_id).await? {
        Some(customer_id) => {
            if req.mode == BillingMode::Subscription {
                state
                    .store
                    .ensure_subscription_placeholder(&customer_id)
                    .await?;
            }
            customer_id
        }
        None => create_customer(&state, &identity, req.mode).await?,
    };

    let session = state
        .stripe
        .create_checkout_session(&CheckoutParams {
            customer_id: &customer_id,
            price_id: req.price_id,
            mode: req.mode,
            success_url: req.success_url,
            cancel_url: req.cancel_url,
        })
        .await
        .map_err(|e| {
            tracing::error!(%e, customer_id = %customer_id, "Failed to create Stripe checkout");
            AppError::new(ErrorCode::PaymentSetupFailed)
        })?;

    let url = session
        .url
        .ok_or_else(|| AppError::new(ErrorCode::PaymentSetupFailed))?;

    tracing::info!(
        session_id = %session.id,
        customer_id = %customer_id,
        mode = req.mode.as_db(),
        "Created checkout session"
    );

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url,
    }))
}

/// Create a Stripe customer and persist the mapping.
///
/// If the mapping cannot be stored the Stripe customer is deleted again, so
/// no customer exists that webhooks could not attribute to a user.
async fn create_customer(
    state: &AppState,
    identity: &UserIdentity,
    mode: BillingMode,
) -> ServiceResult<String> {
    let customer_id = state
        .stripe
        .create_customer(&identity.email, &identity.user_id.to_string())
        .await
        .map_err(|e| {
            tracing::error!(%e, "Failed to create Stripe customer");
            AppError::new(ErrorCode::PaymentSetupFailed)
        })?;
    tracing::info!(customer_id = %customer_id, user_id = %identity.user_id, "Created Stripe customer");

    let persisted = state
        .store
        .link_customer(
            identity.user_id,
            &customer_id,
            mode == BillingMode::Subscription,
        )
        .await;

    if let Err(e) = persisted {
        tracing::error!(%e, customer_id = %customer_id, "Failed to save customer mapping");
        if let Err(e) = state.stripe.delete_customer(&customer_id).await {
            tracing::error!(%e, customer_id = %customer_id, "Failed to delete orphaned Stripe customer");
        }
        return Err(AppError::with_message(
            ErrorCode::PaymentSetupFailed,
            "Failed to create customer mapping",
        )
        .into());
    }

    Ok(customer_id)
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

/// POST /api/billing-portal
pub async fn billing_portal(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    headers: HeaderMap,
) -> ApiResult<PortalResponse> {
    let customer_id = state
        .store
        .find_customer_by_user(identity.user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?;

    let return_url = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|origin| is_http_url(origin))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/settings", state.app_base_url));

    let url = state
        .stripe
        .create_billing_portal_session(&customer_id, &return_url)
        .await
        .map_err(|e| {
            tracing::error!("Billing portal error: {e}");
            AppError::new(ErrorCode::BillingPortalFailed)
        })?;

    tracing::info!(user_id = %identity.user_id, customer_id = %customer_id, "Created billing portal session");
    Ok(Json(PortalResponse { url }))
}

/// GET /api/subscription
///
/// `null` when the user never started a checkout.
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Option<SubscriptionView>> {
    let Some(customer_id) = state.store.find_customer_by_user(identity.user_id).await? else {
        return Ok(Json(None));
    };
    let Some(record) = state.store.get_subscription(&customer_id).await? else {
        return Ok(Json(None));
    };

    let product_name = record
        .price_id
        .as_deref()
        .and_then(|price_id| state.plans.by_price_id(price_id))
        .map(|plan| plan.name.to_string());

    Ok(Json(Some(SubscriptionView {
        has_active_subscription: record.status.is_active(),
        customer_id: record.customer_id,
        subscription_id: record.subscription_id,
        subscription_status: record.status,
        price_id: record.price_id,
        product_name,
        current_period_start: record.current_period_start,
        current_period_end: record.current_period_end,
        cancel_at_period_end: record.cancel_at_period_end,
        payment_method_brand: record.payment_method_brand,
        payment_method_last4: record.payment_method_last4,
    })))
}
