//! HTTP routes

pub mod billing;
pub mod health;
pub mod profile;
pub mod qr_codes;
pub mod redirect;
pub mod stripe_webhook;

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::billing_rate_limit;
use crate::auth::user_auth::user_auth_middleware;
use crate::error::ServiceError;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, ServiceError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Checkout / portal (authenticated + rate limited)
    let billing = Router::new()
        .route("/api/checkout", post(billing::create_checkout))
        .route("/api/billing-portal", post(billing::billing_portal))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            billing_rate_limit,
        ));

    // User API (bearer token)
    let user = Router::new()
        .route("/api/subscription", get(billing::get_subscription))
        .route(
            "/api/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route(
            "/api/qr-codes",
            get(qr_codes::list_qr_codes).post(qr_codes::create_qr_code),
        )
        .route(
            "/api/qr-codes/{id}",
            patch(qr_codes::update_qr_code).delete(qr_codes::delete_qr_code),
        )
        .route("/api/dashboard", get(qr_codes::dashboard))
        .merge(billing)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/plans", get(billing::list_plans))
        .route("/r/{short_code}", get(redirect::redirect))
        .merge(webhook)
        .merge(user)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
