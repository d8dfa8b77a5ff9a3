use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// Full user record. The password hash never serializes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

/// Authenticated principal attached to a request. Selected without the
/// password hash column.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with the default `user` role and an empty cart.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }
}

impl Principal {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Principal>> {
        let principal = sqlx::query_as::<_, Principal>(
            r#"
            SELECT id, name, email, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn duplicate_email_is_a_unique_violation(pool: PgPool) {
        let first = User::create(&pool, "Ann", "ann@x.com", "hash-one")
            .await
            .expect("first signup");
        assert_eq!(first.role, ROLE_USER);

        let err = User::create(&pool, "Impostor", "ann@x.com", "hash-two")
            .await
            .expect_err("second signup with the same email");
        assert!(err
            .as_database_error()
            .is_some_and(|d| d.is_unique_violation()));

        // The original account is untouched.
        let kept = User::find_by_email(&pool, "ann@x.com")
            .await
            .expect("lookup")
            .expect("still present");
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.name, "Ann");
        assert_eq!(kept.password_hash, "hash-one");
    }

    #[sqlx::test]
    async fn principal_lookup_carries_no_hash(pool: PgPool) {
        let user = User::create(&pool, "Bea", "bea@x.com", "hash")
            .await
            .expect("create");

        let principal = Principal::find_by_id(&pool, user.id)
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(principal.email, "bea@x.com");
        assert!(!principal.is_admin());

        let json = serde_json::to_string(&principal).expect("serialize");
        assert!(!json.contains("hash"));
    }
}
