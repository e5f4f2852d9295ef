//! Bearer-token guard.

use crate::auth::token::TokenService;
use crate::entity::Role;
use crate::error::ApiError;
use uuid::Uuid;

/// The caller, as asserted by a verified token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Extract the token from an `Authorization: Bearer <token>` value.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the caller from the `Authorization` header; 401 on any failure.
pub fn authenticate(tokens: &TokenService, authorization: Option<&str>) -> Result<AuthUser, ApiError> {
    let token = bearer_token(authorization).ok_or_else(ApiError::unauthorized)?;
    let claims = tokens.verify(token).map_err(|e| {
        log::debug!("rejected bearer token: {e}");
        ApiError::unauthorized()
    })?;
    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// 403 unless the caller has one of `allowed`.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}
