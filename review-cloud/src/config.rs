//! Service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// review-cloud configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Accept webhook bodies without a Stripe-Signature header (development only)
    pub allow_unsigned_webhooks: bool,
    /// HS256 secret the hosted auth provider signs access tokens with
    pub jwt_secret: String,
    /// Public base URL of the web app (billing portal fallback return URL)
    pub app_base_url: String,
    /// Stripe Price ID for the Starter plan (monthly)
    pub stripe_starter_price_id: String,
    /// Stripe Price ID for the Growth plan (monthly)
    pub stripe_growth_price_id: String,
    /// Stripe Price ID for the Pro / Agency plan (monthly)
    pub stripe_pro_price_id: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn flag(name: &str) -> bool {
        std::env::var(name)
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let allow_unsigned_webhooks = Self::flag("ALLOW_UNSIGNED_WEBHOOKS");
        if allow_unsigned_webhooks && environment != "development" {
            return Err(format!(
                "ALLOW_UNSIGNED_WEBHOOKS is only permitted in development (got {environment})"
            )
            .into());
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            allow_unsigned_webhooks,
            jwt_secret: Self::require_secret("SUPABASE_JWT_SECRET", &environment)?,
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            stripe_starter_price_id: std::env::var("STRIPE_STARTER_PRICE_ID")
                .unwrap_or_else(|_| "price_Starter_Monthly".into()),
            stripe_growth_price_id: std::env::var("STRIPE_GROWTH_PRICE_ID")
                .unwrap_or_else(|_| "price_Growth_Monthly".into()),
            stripe_pro_price_id: std::env::var("STRIPE_PRO_PRICE_ID")
                .unwrap_or_else(|_| "price_Pro_Monthly".into()),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Development configuration with fixed secrets
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/review_cloud_test".into(),
            http_port: 0,
            environment: "development".into(),
            stripe_secret_key: "sk_test_dummy".into(),
            stripe_webhook_secret: "whsec_test".into(),
            allow_unsigned_webhooks: false,
            jwt_secret: "test-jwt-secret".into(),
            app_base_url: "http://localhost:5173".into(),
            stripe_starter_price_id: "price_Starter_Monthly".into(),
            stripe_growth_price_id: "price_Growth_Monthly".into(),
            stripe_pro_price_id: "price_Pro_Monthly".into(),
        }
    }
}
