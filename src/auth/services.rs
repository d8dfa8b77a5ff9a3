use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use time::Duration as TimeDuration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::{JwtKeys, TokenError},
    error::ApiError,
    state::AppState,
};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn refresh_key(user_id: Uuid) -> String {
    format!("refresh_token:{}", user_id)
}

/// Sign a fresh token pair and record the refresh token as the single live
/// reference for this user. A prior reference is overwritten, which revokes
/// any refresh token from an earlier session.
pub async fn issue_session(state: &AppState, user_id: Uuid) -> anyhow::Result<(String, String)> {
    let keys = JwtKeys::from_ref(state);
    let access = keys.sign_access(user_id)?;
    let refresh = keys.sign_refresh(user_id)?;
    state
        .cache
        .put(
            &refresh_key(user_id),
            &refresh,
            Some(keys.refresh_ttl.as_secs()),
        )
        .await?;
    debug!(user_id = %user_id, "session issued");
    Ok((access, refresh))
}

/// Exchange a refresh token for a new access token. The presented token must
/// exactly equal the cached reference; a superseded or revoked token fails
/// even if its signature is still valid. The refresh token is not rotated.
pub async fn refresh_access(state: &AppState, refresh_token: &str) -> Result<String, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        ApiError::Unauthorized(match e {
            TokenError::Expired => "Refresh token expired".into(),
            TokenError::Invalid => "Invalid refresh token".into(),
        })
    })?;

    let cached = state.cache.get(&refresh_key(claims.sub)).await?;
    if cached.as_deref() != Some(refresh_token) {
        warn!(user_id = %claims.sub, "refresh token does not match cached reference");
        return Err(ApiError::Unauthorized("Invalid refresh token".into()));
    }

    Ok(keys.sign_access(claims.sub)?)
}

/// Best-effort revocation: deletes the cached reference when the presented
/// token verifies. Missing, invalid or expired tokens are ignored, and cache
/// failures are logged rather than surfaced. Logout never fails the caller.
pub async fn revoke_session(state: &AppState, refresh_token: &str) {
    let keys = JwtKeys::from_ref(state);
    match keys.verify_refresh(refresh_token) {
        Ok(claims) => {
            if let Err(e) = state.cache.delete(&refresh_key(claims.sub)).await {
                warn!(error = %e, user_id = %claims.sub, "failed to delete refresh reference");
            }
        }
        Err(e) => debug!(error = %e, "logout with unverifiable refresh token"),
    }
}

fn build_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(TimeDuration::seconds(max_age_secs))
        .build()
}

/// Access/refresh cookie pair: HTTP-only, SameSite=Strict, Secure in
/// production, max-age matching each token's TTL.
pub fn session_cookies(
    state: &AppState,
    access: String,
    refresh: String,
) -> (Cookie<'static>, Cookie<'static>) {
    let jwt = &state.config.jwt;
    let secure = state.config.production;
    (
        build_cookie(ACCESS_COOKIE, access, jwt.access_ttl_minutes * 60, secure),
        build_cookie(
            REFRESH_COOKIE,
            refresh,
            jwt.refresh_ttl_days * 24 * 60 * 60,
            secure,
        ),
    )
}

pub fn access_cookie(state: &AppState, access: String) -> Cookie<'static> {
    build_cookie(
        ACCESS_COOKIE,
        access,
        state.config.jwt.access_ttl_minutes * 60,
        state.config.production,
    )
}

/// Clearing cookie: same attributes as the cookie it overwrites, max-age 0.
pub fn expired_cookie(state: &AppState, name: &'static str) -> Cookie<'static> {
    build_cookie(name, String::new(), 0, state.config.production)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ann@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[tokio::test]
    async fn session_cookie_attributes() {
        let state = AppState::fake();
        let (access, refresh) = session_cookies(&state, "a-token".into(), "r-token".into());

        assert_eq!(access.name(), ACCESS_COOKIE);
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Strict));
        assert_eq!(access.max_age(), Some(TimeDuration::minutes(15)));

        assert_eq!(refresh.name(), REFRESH_COOKIE);
        assert_eq!(refresh.http_only(), Some(true));
        assert_eq!(refresh.max_age(), Some(TimeDuration::days(7)));
    }

    #[tokio::test]
    async fn cookies_are_secure_in_production() {
        let fake = AppState::fake();
        let mut config = (*fake.config).clone();
        config.production = true;
        let state = AppState::from_parts(
            fake.db.clone(),
            std::sync::Arc::new(config),
            fake.cache.clone(),
            fake.storage.clone(),
        );

        let (access, refresh) = session_cookies(&state, "a-token".into(), "r-token".into());
        assert_eq!(access.secure(), Some(true));
        assert_eq!(refresh.secure(), Some(true));

        // Clearing cookies carry the same Secure flag as the ones they
        // overwrite, otherwise the browser keeps the originals.
        let cleared = expired_cookie(&state, ACCESS_COOKIE);
        assert_eq!(cleared.secure(), Some(true));
        assert_eq!(cleared.max_age(), Some(TimeDuration::ZERO));

        let dev = AppState::fake();
        assert_eq!(expired_cookie(&dev, ACCESS_COOKIE).secure(), Some(false));
    }

    #[tokio::test]
    async fn issue_then_refresh_roundtrip() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();

        let (_access, refresh) = issue_session(&state, user_id).await.expect("issue");
        let new_access = refresh_access(&state, &refresh).await.expect("refresh");
        assert!(!new_access.is_empty());
    }

    #[tokio::test]
    async fn new_session_invalidates_prior_refresh_token() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();

        let (_, old_refresh) = issue_session(&state, user_id).await.expect("first issue");
        let (_, new_refresh) = issue_session(&state, user_id).await.expect("second issue");

        let err = refresh_access(&state, &old_refresh).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);

        refresh_access(&state, &new_refresh)
            .await
            .expect("latest reference still valid");
    }

    #[tokio::test]
    async fn revoked_session_cannot_refresh() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();

        let (_, refresh) = issue_session(&state, user_id).await.expect("issue");
        revoke_session(&state, &refresh).await;

        let err = refresh_access(&state, &refresh).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn revoke_tolerates_garbage_tokens() {
        let state = AppState::fake();
        revoke_session(&state, "definitely-not-a-jwt").await;
        revoke_session(&state, "").await;
    }

    #[tokio::test]
    async fn refresh_rejects_unknown_token() {
        let state = AppState::fake();
        let err = refresh_access(&state, "garbage").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rejects_token_never_cached() {
        let state = AppState::fake();
        let keys = JwtKeys::from_config(&state.config.jwt);
        // Valid signature, but no cached reference for this user.
        let orphan = keys.sign_refresh(Uuid::new_v4()).expect("sign");
        let err = refresh_access(&state, &orphan).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
