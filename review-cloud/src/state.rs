//! Application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::rate_limit::RateLimiter;
use crate::billing::{PlanCatalog, Reconciler};
use crate::config::Config;
use crate::db::{PgStore, Store};
use crate::stripe::{HttpStripeClient, StripeApi};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub stripe: Arc<dyn StripeApi>,
    pub plans: Arc<PlanCatalog>,
    /// Webhook-driven subscription sync
    pub reconciler: Arc<Reconciler>,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Accept unsigned webhook bodies (development only)
    pub allow_unsigned_webhooks: bool,
    /// HS256 secret for bearer token verification
    pub jwt_secret: String,
    /// Fallback return URL base for the billing portal
    pub app_base_url: String,
    /// Rate limiter for billing routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the Stripe client
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::from_parts(
            Arc::new(PgStore::new(pool)),
            Arc::new(HttpStripeClient::new(&config.stripe_secret_key)),
            PlanCatalog::from_config(config),
            config,
        ))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        stripe: Arc<dyn StripeApi>,
        plans: PlanCatalog,
        config: &Config,
    ) -> Self {
        let plans = Arc::new(plans);
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            stripe.clone(),
            plans.clone(),
        ));
        Self {
            store,
            stripe,
            plans,
            reconciler,
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            allow_unsigned_webhooks: config.allow_unsigned_webhooks,
            jwt_secret: config.jwt_secret.clone(),
            app_base_url: config.app_base_url.clone(),
            rate_limiter: RateLimiter::new(),
        }
    }
}
