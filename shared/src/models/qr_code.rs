//! QR code / short link model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Short link owned by a user, printed as a QR code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Redirect destination (Google Business review page)
    pub google_business_url: String,
    pub short_code: String,
    pub scan_count: i64,
    pub fg_color: Option<String>,
    pub bg_color: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional QR rendering style
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QrStyle {
    pub fg_color: Option<String>,
    pub bg_color: Option<String>,
    pub logo_url: Option<String>,
}

/// Create QR code payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCodeCreate {
    pub title: String,
    pub google_business_url: String,
    #[serde(flatten)]
    pub style: QrStyle,
}

/// Update QR code payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrCodeUpdate {
    pub title: Option<String>,
    pub google_business_url: Option<String>,
    pub fg_color: Option<String>,
    pub bg_color: Option<String>,
    pub logo_url: Option<String>,
}

/// Dashboard summary for the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_codes: i64,
    pub total_scans: i64,
    pub recent: Vec<QrCode>,
}

/// `http://` or `https://` URL with a non-empty host part and no whitespace
/// or control characters (the value must fit in a `Location` header)
pub fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !s.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    }
}

/// `#RRGGBB` hex color
pub fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}
