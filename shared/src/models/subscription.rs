//! Subscription lifecycle and plan tier models

use serde::{Deserialize, Serialize};

/// Stripe subscription lifecycle status, plus `not_started` for customers that
/// opened a checkout but have no subscription yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    NotStarted,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
}

/// How a status change relates to the expected Stripe lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same status as before
    Unchanged,
    /// A move Stripe normally makes
    Expected,
    /// A move the lifecycle does not predict (out-of-order delivery, manual edits)
    Unexpected,
}

impl SubscriptionStatus {
    /// Parse from database / Stripe string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "incomplete" => Some(Self::Incomplete),
            "incomplete_expired" => Some(Self::IncompleteExpired),
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            "unpaid" => Some(Self::Unpaid),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }

    /// Database string representation (lowercase, same as Stripe)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }

    /// Does this status grant access to paid features?
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// Classify a move from `self` to `next`.
    ///
    /// `canceled` and `incomplete_expired` are terminal for a single Stripe
    /// subscription, but the record is keyed by customer, so a brand-new
    /// subscription may follow them.
    pub fn transition_to(&self, next: Self) -> Transition {
        use SubscriptionStatus::*;

        if *self == next {
            return Transition::Unchanged;
        }

        let expected = match self {
            NotStarted => matches!(next, Incomplete | Trialing | Active | Canceled),
            Incomplete => matches!(next, Active | Trialing | IncompleteExpired | Canceled),
            Trialing => matches!(next, Active | PastDue | Unpaid | Paused | Canceled),
            Active => matches!(next, PastDue | Unpaid | Paused | Canceled),
            PastDue => matches!(next, Active | Unpaid | Canceled),
            Unpaid => matches!(next, Active | Canceled),
            Paused => matches!(next, Active | Canceled),
            Canceled | IncompleteExpired => matches!(next, Incomplete | Trialing | Active),
        };

        if expected {
            Transition::Expected
        } else {
            Transition::Unexpected
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Commercial plan level granted to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Trial,
    Starter,
    Growth,
    Pro,
}

impl Tier {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "trial" => Some(Self::Trial),
            "starter" => Some(Self::Starter),
            "growth" => Some(Self::Growth),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Trial => "trial",
            Self::Starter => "starter",
            Self::Growth => "growth",
            Self::Pro => "pro",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Checkout mode accepted by Stripe Checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    /// One-time payment
    Payment,
    /// Recurring plan
    Subscription,
}

impl BillingMode {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "payment" => Some(Self::Payment),
            "subscription" => Some(Self::Subscription),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

/// Subscription record as shown to the owning user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionView {
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub price_id: Option<String>,
    /// Display name of the plan matching `price_id`, if any
    pub product_name: Option<String>,
    /// Unix seconds
    pub current_period_start: Option<i64>,
    /// Unix seconds
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub payment_method_brand: Option<String>,
    pub payment_method_last4: Option<String>,
    pub has_active_subscription: bool,
}
