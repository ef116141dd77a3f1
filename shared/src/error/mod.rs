//! Error codes and the API error body
//!
//! Every failed request is answered with an [`ApiResponse`] built from an
//! [`AppError`]. The HTTP status follows from the [`ErrorCode`].
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 3xxx: Billing errors
//! - 4xxx: QR code errors
//! - 5xxx: Profile errors
//! - 9xxx: System errors
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::PlanNotFound).with_detail("price_id", "price_x");
//! assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::ErrorCode;
pub use types::{ApiResponse, AppError};
