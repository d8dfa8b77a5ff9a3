use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::{
    auth::{
        jwt::{JwtKeys, TokenError},
        repo::Principal,
        services::ACCESS_COOKIE,
    },
    error::ApiError,
    state::AppState,
};

/// Request gate: resolves the access-token cookie into an authenticated
/// principal. Missing, expired and invalid tokens reject with distinct
/// messages so clients know when a refresh attempt is worthwhile.
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| {
                ApiError::Unauthorized("Unauthorized - No access token provided".into())
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(&token).map_err(|e| {
            warn!(error = %e, "access token rejected");
            ApiError::Unauthorized(match e {
                TokenError::Expired => "Unauthorized - Token expired".into(),
                TokenError::Invalid => "Unauthorized - Invalid token".into(),
            })
        })?;

        let principal = Principal::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized - User not found".into()))?;

        Ok(AuthUser(principal))
    }
}

/// Pure role check, no I/O.
pub fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Gate + admin role check for catalog writes.
pub struct AdminUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        require_admin(&principal)?;
        Ok(AdminUser(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{ROLE_ADMIN, ROLE_USER};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn principal(role: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            role: role.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn admin_passes_role_check() {
        assert!(require_admin(&principal(ROLE_ADMIN)).is_ok());
    }

    #[test]
    fn non_admin_is_forbidden() {
        let err = require_admin(&principal(ROLE_USER)).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
