//! Short link redirect
//!
//! GET /r/{short_code} — count the scan and send the visitor to the review page

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Redirect;

use crate::db::ScanInfo;
use crate::state::AppState;
use crate::util::SHORT_CODE_LEN;

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn is_short_code(code: &str) -> bool {
    code.len() == SHORT_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Unknown codes, unusable destinations and store failures land on the app
/// home page.
pub async fn redirect(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
    headers: HeaderMap,
) -> Redirect {
    let home = format!("{}/", state.app_base_url);

    if !is_short_code(&short_code) {
        tracing::debug!(short_code = %short_code, "Malformed short code");
        return Redirect::to(&home);
    }

    let scan = ScanInfo {
        user_agent: header_value(&headers, header::USER_AGENT),
        referrer: header_value(&headers, header::REFERER),
    };

    match state.store.record_scan(&short_code, &scan).await {
        Ok(Some(destination)) if HeaderValue::try_from(destination.as_str()).is_ok() => {
            tracing::debug!(short_code = %short_code, "Redirecting scan");
            Redirect::to(&destination)
        }
        Ok(Some(destination)) => {
            tracing::warn!(short_code = %short_code, destination = %destination.escape_debug(), "Destination is not a valid Location header");
            Redirect::to(&home)
        }
        Ok(None) => {
            tracing::info!(short_code = %short_code, "Unknown short code");
            Redirect::to(&home)
        }
        Err(e) => {
            tracing::error!(short_code = %short_code, %e, "Failed to record scan");
            Redirect::to(&home)
        }
    }
}
