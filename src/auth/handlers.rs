use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, MessageResponse, PublicUser, SignupRequest},
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo::{Principal, User},
        services::{
            access_cookie, expired_cookie, is_valid_email, issue_session, refresh_access,
            revoke_session, session_cookies, ACCESS_COOKIE, REFRESH_COOKIE,
        },
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/profile", get(profile))
}

#[instrument(skip(state, jar, payload))]
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = match User::create(&state.db, payload.name.trim(), &payload.email, &hash).await {
        Ok(u) => u,
        // Lost the duplicate-check race; same outcome as the pre-check.
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
            return Err(ApiError::Conflict("User already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let (access, refresh) = issue_session(&state, user.id).await?;
    let (access_cookie, refresh_cookie) = session_cookies(&state, access, refresh);

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        jar.add(access_cookie).add(refresh_cookie),
        Json(PublicUser::from(user)),
    ))
}

#[instrument(skip(state, jar, payload))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let (access, refresh) = issue_session(&state, user.id).await?;
    let (access_cookie, refresh_cookie) = session_cookies(&state, access, refresh);

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar.add(access_cookie).add(refresh_cookie),
        Json(PublicUser::from(user)),
    ))
}

/// Never fails to the caller: the cached reference is removed when the
/// refresh token verifies, and both cookies are cleared either way.
#[instrument(skip(state, jar))]
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        revoke_session(&state, cookie.value()).await;
    }

    (
        jar.add(expired_cookie(&state, ACCESS_COOKIE))
            .add(expired_cookie(&state, REFRESH_COOKIE)),
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

#[instrument(skip(state, jar))]
async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let refresh = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("No refresh token provided".into()))?;

    let access = refresh_access(&state, &refresh).await?;

    Ok((
        jar.add(access_cookie(&state, access)),
        Json(MessageResponse {
            message: "Token refreshed successfully",
        }),
    ))
}

#[instrument(skip_all, fields(user_id = %principal.id))]
async fn profile(AuthUser(principal): AuthUser) -> Json<Principal> {
    Json(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn public_user_omits_credentials() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: "user".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("ann@x.com"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
