//! Bearer token authentication for the user API
//!
//! Tokens are issued by the hosted auth provider and signed HS256 with the
//! project JWT secret; this service only verifies them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::state::AppState;

/// Audience the auth provider stamps on signed-in user tokens
const AUDIENCE: &str = "authenticated";

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: String,
}

/// Verify a token and extract the caller's identity
pub fn verify_token(token: &str, secret: &str) -> Result<UserIdentity, AppError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);

    let token_data = jsonwebtoken::decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
            _ => AppError::invalid_token("Invalid or expired token"),
        }
    })?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::invalid_token("Token subject is not a user id"))?;

    Ok(UserIdentity {
        user_id,
        email: token_data.claims.email.unwrap_or_default(),
    })
}

/// Middleware that verifies the bearer token and inserts [`UserIdentity`]
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::not_authenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

    let identity = verify_token(token, &state.jwt_secret)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Sign a token the way the auth provider does
#[cfg(test)]
pub fn create_token(
    user_id: Uuid,
    email: &str,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    use jsonwebtoken::{EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = UserClaims {
        sub: user_id.to_string(),
        email: Some(email.to_string()),
        aud: AUDIENCE.to_string(),
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
