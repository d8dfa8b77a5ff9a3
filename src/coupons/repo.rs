use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_percentage: i32,
    pub is_active: bool,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Coupon {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at < now
    }
}

pub async fn find_active(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(
        r#"
        SELECT id, code, discount_percentage, is_active, user_id, expires_at, created_at
        FROM coupons
        WHERE user_id = $1 AND is_active
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(coupon)
}

/// Ownership is part of the lookup key: another user's coupon never matches,
/// even with the right code.
pub async fn find_active_by_code(
    db: &PgPool,
    user_id: Uuid,
    code: &str,
) -> anyhow::Result<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(
        r#"
        SELECT id, code, discount_percentage, is_active, user_id, expires_at, created_at
        FROM coupons
        WHERE code = $1 AND user_id = $2 AND is_active
        "#,
    )
    .bind(code)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(coupon)
}

/// Deactivation is terminal for this subsystem; nothing here ever flips a
/// coupon back to active, so concurrent expiry flips are harmless.
pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE coupons
        SET is_active = FALSE
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn coupon(expires_at: OffsetDateTime) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "GIMME10".into(),
            discount_percentage: 10,
            is_active: true,
            user_id: Uuid::new_v4(),
            expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn expiry_is_strict_past() {
        let now = OffsetDateTime::now_utc();
        assert!(coupon(now - Duration::seconds(1)).is_expired(now));
        assert!(!coupon(now + Duration::days(1)).is_expired(now));
        assert!(!coupon(now).is_expired(now));
    }
}
