//! Profile endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use shared::error::{AppError, ErrorCode};
use shared::models::{Profile, ProfileUpdate, is_http_url};

use crate::auth::UserIdentity;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/profile — created from token claims on first access
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Profile> {
    let profile = state
        .store
        .ensure_profile(identity.user_id, &identity.email)
        .await?;
    Ok(Json(profile))
}

/// PATCH /api/profile — company name and default destination only
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Profile> {
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;
    if let Some(url) = req.google_business_url.as_deref().filter(|u| !u.is_empty())
        && !is_http_url(url)
    {
        return Err(AppError::new(ErrorCode::InvalidDestinationUrl).into());
    }

    state
        .store
        .ensure_profile(identity.user_id, &identity.email)
        .await?;
    let profile = state
        .store
        .update_profile(identity.user_id, &req)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))?;

    tracing::info!(user_id = %identity.user_id, "Updated profile");
    Ok(Json(profile))
}
