//! Unified error codes for review-cloud
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 3xxx: Billing errors
//! - 4xxx: QR code errors
//! - 5xxx: Profile errors
//! - 9xxx: System errors

use serde::Serialize;
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the frontend can
/// switch on them without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Request body or parameters failed validation
    ValidationFailed = 2,
    /// Too many requests from one client
    TooManyRequests = 8,

    // ==================== 1xxx: Auth ====================
    /// No bearer token on the request
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 3xxx: Billing ====================
    /// No Stripe customer linked to the user
    CustomerNotFound = 3001,
    /// Stripe customer or checkout could not be set up
    PaymentSetupFailed = 3002,
    /// Price id is not part of the plan catalog
    PlanNotFound = 3003,
    /// Billing portal session could not be created
    BillingPortalFailed = 3005,

    // ==================== 4xxx: QR code ====================
    /// QR code not found (or not owned by the caller)
    QrCodeNotFound = 4001,
    /// Could not allocate a unique short code
    ShortCodeExhausted = 4002,
    /// Destination URL is not an http(s) URL
    InvalidDestinationUrl = 4003,
    /// Color is not a #RRGGBB value
    InvalidColor = 4004,

    // ==================== 5xxx: Profile ====================
    ProfileNotFound = 5001,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            ErrorCode::CustomerNotFound => "Customer not found or not linked to Stripe.",
            ErrorCode::PaymentSetupFailed => "Payment setup failed",
            ErrorCode::PlanNotFound => "Price is not part of any plan",
            ErrorCode::BillingPortalFailed => "Failed to create billing portal session",

            ErrorCode::QrCodeNotFound => "QR code not found",
            ErrorCode::ShortCodeExhausted => "Could not allocate a unique short code",
            ErrorCode::InvalidDestinationUrl => "Destination must be an http(s) URL",
            ErrorCode::InvalidColor => "Color must be a #RRGGBB value",

            ErrorCode::ProfileNotFound => "Profile not found",

            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
