//! Shared types for review-cloud
//!
//! Error codes, the API error body, and the domain models (subscription
//! status, plan tier, profile, QR code) used by the service and by its API
//! consumers.

pub mod error;
pub mod models;
pub mod util;
