//! Plan catalog and tier resolution

use serde::Serialize;
use shared::models::{BillingMode, SubscriptionStatus, Tier};

use crate::config::Config;

/// A purchasable plan, keyed by its Stripe price id
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub price_id: String,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: Tier,
    pub mode: BillingMode,
    /// Monthly price in whole dollars
    pub price: u32,
}

/// Static price id -> plan lookup table
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// Starter / Growth / Pro with price ids from the environment
    pub fn from_config(config: &Config) -> Self {
        Self::standard(
            &config.stripe_starter_price_id,
            &config.stripe_growth_price_id,
            &config.stripe_pro_price_id,
        )
    }

    pub fn standard(starter: &str, growth: &str, pro: &str) -> Self {
        Self::new(vec![
            Plan {
                price_id: starter.to_string(),
                name: "Starter",
                description: "For solopreneurs & micro-SMBs.",
                tier: Tier::Starter,
                mode: BillingMode::Subscription,
                price: 19,
            },
            Plan {
                price_id: growth.to_string(),
                name: "Growth",
                description: "Designed for 1–5 location businesses.",
                tier: Tier::Growth,
                mode: BillingMode::Subscription,
                price: 49,
            },
            Plan {
                price_id: pro.to_string(),
                name: "Pro / Agency",
                description: "For franchises, agencies, or multi-location SMBs.",
                tier: Tier::Pro,
                mode: BillingMode::Subscription,
                price: 149,
            },
        ])
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn by_price_id(&self, price_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.price_id == price_id)
    }

    /// Tier granted by a subscription in `status` on `price_id`.
    ///
    /// Trialing always grants `trial`; active grants the plan's tier; every
    /// other status, and any price id outside the catalog, degrades to `free`.
    pub fn resolve_tier(&self, status: SubscriptionStatus, price_id: Option<&str>) -> Tier {
        match status {
            SubscriptionStatus::Trialing => Tier::Trial,
            SubscriptionStatus::Active => price_id
                .and_then(|id| self.by_price_id(id))
                .map(|plan| plan.tier)
                .unwrap_or(Tier::Free),
            _ => Tier::Free,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_catalog() -> PlanCatalog {
    PlanCatalog::standard(
        "price_Starter_Monthly",
        "price_Growth_Monthly",
        "price_Pro_Monthly",
    )
}
