//! QR code CRUD and dashboard (owner-scoped)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    DashboardStats, QrCode, QrCodeCreate, QrCodeUpdate, QrStyle, is_hex_color, is_http_url,
};
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::db::NewQrCode;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::generate_short_code;

use super::ApiResult;

/// Attempts at drawing an unused short code before giving up
const MAX_SHORT_CODE_ATTEMPTS: usize = 5;

fn validate_destination(url: &str) -> Result<(), AppError> {
    if !is_http_url(url) {
        return Err(AppError::new(ErrorCode::InvalidDestinationUrl).with_detail("url", url));
    }
    Ok(())
}

/// Empty strings are accepted: on update they clear the field
fn validate_style(fg: Option<&str>, bg: Option<&str>, logo: Option<&str>) -> Result<(), AppError> {
    for (field, color) in [("fg_color", fg), ("bg_color", bg)] {
        if let Some(color) = color.filter(|c| !c.is_empty())
            && !is_hex_color(color)
        {
            return Err(AppError::new(ErrorCode::InvalidColor).with_detail("field", field));
        }
    }
    if let Some(logo) = logo.filter(|l| !l.is_empty())
        && !is_http_url(logo)
    {
        return Err(AppError::validation("logo_url must be an http(s) URL"));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation("title must not be empty").with_detail("field", "title"));
    }
    Ok(())
}

/// GET /api/qr-codes
pub async fn list_qr_codes(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<QrCode>> {
    Ok(Json(state.store.list_qr_codes(identity.user_id).await?))
}

/// POST /api/qr-codes
pub async fn create_qr_code(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    body: Result<Json<QrCodeCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<QrCode>), ServiceError> {
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;
    validate_title(&req.title)?;
    validate_destination(&req.google_business_url)?;
    validate_style(
        req.style.fg_color.as_deref(),
        req.style.bg_color.as_deref(),
        req.style.logo_url.as_deref(),
    )?;

    state
        .store
        .ensure_profile(identity.user_id, &identity.email)
        .await?;

    let style = QrStyle {
        fg_color: req.style.fg_color.filter(|c| !c.is_empty()),
        bg_color: req.style.bg_color.filter(|c| !c.is_empty()),
        logo_url: req.style.logo_url.filter(|l| !l.is_empty()),
    };
    let id = Uuid::new_v4();

    for attempt in 1..=MAX_SHORT_CODE_ATTEMPTS {
        let new_code = NewQrCode {
            id,
            user_id: identity.user_id,
            title: req.title.trim().to_string(),
            google_business_url: req.google_business_url.clone(),
            short_code: generate_short_code(),
            style: style.clone(),
        };
        match state.store.insert_qr_code(&new_code).await? {
            Some(qr) => {
                tracing::info!(qr_code_id = %qr.id, short_code = %qr.short_code, "Created QR code");
                return Ok((StatusCode::CREATED, Json(qr)));
            }
            None => {
                tracing::debug!(attempt, short_code = %new_code.short_code, "Short code collision");
            }
        }
    }

    Err(AppError::new(ErrorCode::ShortCodeExhausted).into())
}

/// PATCH /api/qr-codes/{id}
pub async fn update_qr_code(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
    body: Result<Json<QrCodeUpdate>, JsonRejection>,
) -> ApiResult<QrCode> {
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(url) = &req.google_business_url {
        validate_destination(url)?;
    }
    validate_style(
        req.fg_color.as_deref(),
        req.bg_color.as_deref(),
        req.logo_url.as_deref(),
    )?;

    let qr = state
        .store
        .update_qr_code(identity.user_id, id, &req)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::QrCodeNotFound))?;
    Ok(Json(qr))
}

/// DELETE /api/qr-codes/{id}
pub async fn delete_qr_code(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    if !state.store.delete_qr_code(identity.user_id, id).await? {
        return Err(AppError::new(ErrorCode::QrCodeNotFound).into());
    }
    tracing::info!(qr_code_id = %id, "Deleted QR code");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<DashboardStats> {
    Ok(Json(state.store.dashboard(identity.user_id).await?))
}
