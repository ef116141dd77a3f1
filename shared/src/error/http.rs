//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::CustomerNotFound | Self::QrCodeNotFound | Self::ProfileNotFound => {
                StatusCode::NOT_FOUND
            }

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            Self::InternalError
            | Self::PaymentSetupFailed
            | Self::BillingPortalFailed
            | Self::ShortCodeExhausted => StatusCode::INTERNAL_SERVER_ERROR,

            Self::ValidationFailed
            | Self::PlanNotFound
            | Self::InvalidDestinationUrl
            | Self::InvalidColor => StatusCode::BAD_REQUEST,
        }
    }
}
