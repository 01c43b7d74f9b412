//! Axum extractors for authenticated callers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::Identity;
use crate::error::BoxOfficeError;

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

/// An authenticated caller with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Identity);

fn bearer_token(parts: &Parts) -> Result<&str, BoxOfficeError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| BoxOfficeError::Unauthorized("missing authorization header".to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| BoxOfficeError::Unauthorized("expected a bearer token".to_string()))?
        .trim();
    if token.is_empty() {
        return Err(BoxOfficeError::Unauthorized("empty bearer token".to_string()));
    }
    Ok(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = BoxOfficeError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state.authenticator.authenticate(token).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = BoxOfficeError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            return Err(BoxOfficeError::Forbidden("admin role required".to_string()));
        }
        Ok(Self(identity))
    }
}
