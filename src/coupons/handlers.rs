use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

use super::dto::{ValidateQuery, ValidatedCoupon};
use super::repo::{self, Coupon};

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(get_coupon))
        .route("/coupons/validate", get(validate_coupon))
}

/// The user's active coupon, or JSON `null` when none exists. Having no
/// coupon is not an error.
#[instrument(skip_all, fields(user_id = %principal.id))]
async fn get_coupon(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Option<Coupon>>, ApiError> {
    Ok(Json(repo::find_active(&state.db, principal.id).await?))
}

/// Write-on-read by design: the first validation after a coupon's expiry
/// persists `is_active = false`, so the next lookup misses entirely.
#[instrument(skip_all, fields(user_id = %principal.id))]
async fn validate_coupon(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<ValidatedCoupon>, ApiError> {
    if query.code.trim().is_empty() {
        return Err(ApiError::Validation("Coupon code is required".into()));
    }

    let coupon = repo::find_active_by_code(&state.db, principal.id, query.code.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid or inactive coupon code".into()))?;

    if coupon.is_expired(OffsetDateTime::now_utc()) {
        repo::deactivate(&state.db, coupon.id).await?;
        info!(coupon_id = %coupon.id, "expired coupon deactivated");
        return Err(ApiError::Validation("Coupon code has expired".into()));
    }

    Ok(Json(ValidatedCoupon {
        message: "Coupon code is valid",
        code: coupon.code,
        discount_percentage: coupon.discount_percentage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_coupon_response_shape() {
        let body = ValidatedCoupon {
            message: "Coupon code is valid",
            code: "GIMME10".into(),
            discount_percentage: 10,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "GIMME10");
        assert_eq!(json["discountPercentage"], 10);
    }

    #[test]
    fn validate_query_defaults_to_empty_code() {
        let q: ValidateQuery = serde_json::from_str("{}").unwrap();
        assert!(q.code.is_empty());
    }

    use axum::http::StatusCode;
    use sqlx::PgPool;
    use time::Duration;
    use uuid::Uuid;

    async fn seed_principal(db: &PgPool, email: &str) -> crate::auth::repo::Principal {
        sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ('Ann', $1, 'x')
            RETURNING id, name, email, role, created_at
            "#,
        )
        .bind(email)
        .fetch_one(db)
        .await
        .expect("seed user")
    }

    async fn seed_coupon(db: &PgPool, user_id: Uuid, code: &str, expires_at: OffsetDateTime) {
        sqlx::query(
            r#"
            INSERT INTO coupons (code, discount_percentage, user_id, expires_at)
            VALUES ($1, 10, $2, $3)
            "#,
        )
        .bind(code)
        .bind(user_id)
        .bind(expires_at)
        .execute(db)
        .await
        .expect("seed coupon");
    }

    fn test_state(pool: PgPool) -> AppState {
        let fake = AppState::fake();
        AppState::from_parts(pool, fake.config.clone(), fake.cache.clone(), fake.storage)
    }

    async fn validate(
        state: &AppState,
        principal: &crate::auth::repo::Principal,
        code: &str,
    ) -> Result<Json<ValidatedCoupon>, ApiError> {
        validate_coupon(
            State(state.clone()),
            AuthUser(principal.clone()),
            Query(ValidateQuery { code: code.into() }),
        )
        .await
    }

    #[sqlx::test]
    async fn coupon_owned_by_another_user_never_matches(pool: PgPool) {
        let owner = seed_principal(&pool, "owner@x.com").await;
        let other = seed_principal(&pool, "other@x.com").await;
        let expires = OffsetDateTime::now_utc() + Duration::days(1);
        seed_coupon(&pool, owner.id, "GIMME10", expires).await;
        let state = test_state(pool);

        let err = validate(&state, &other, "GIMME10").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let ok = validate(&state, &owner, "GIMME10").await.expect("owner");
        assert_eq!(ok.0.discount_percentage, 10);
    }

    #[sqlx::test]
    async fn expired_coupon_deactivates_then_misses(pool: PgPool) {
        let owner = seed_principal(&pool, "owner@x.com").await;
        let expires = OffsetDateTime::now_utc() - Duration::days(1);
        seed_coupon(&pool, owner.id, "GIMME10", expires).await;
        let state = test_state(pool);

        // First touch after expiry persists the flip and fails validation.
        let err = validate(&state, &owner, "GIMME10").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        // The flip is durable: the coupon no longer exists for this user.
        let err = validate(&state, &owner, "GIMME10").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(repo::find_active(&state.db, owner.id)
            .await
            .expect("lookup")
            .is_none());
    }
}
