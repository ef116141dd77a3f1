//! Data models
//!
//! Shared between review-cloud and its API consumers. Database rows live in
//! review-cloud's `db` module and convert into these types; lifecycle enums
//! are stored as lowercase text (`as_db` / `from_db`).

pub mod profile;
pub mod qr_code;
pub mod subscription;

// Re-exports
pub use profile::*;
pub use qr_code::*;
pub use subscription::*;
