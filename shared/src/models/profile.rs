//! User profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Tier;

/// User profile: business data the user edits plus tier fields that only the
/// subscription sync writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub company_name: Option<String>,
    /// Default review page used when creating QR codes
    pub google_business_url: Option<String>,
    pub subscription_tier: Tier,
    pub is_active_subscription: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Update profile payload (tier fields are deliberately absent)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub company_name: Option<String>,
    pub google_business_url: Option<String>,
}
