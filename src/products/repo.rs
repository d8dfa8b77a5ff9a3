use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: sqlx::types::Decimal,
    #[serde(skip_serializing, default)]
    pub image_key: Option<String>,
    pub image_url: Option<String>,
    pub category: String,
    pub is_featured: bool,
    pub created_at: OffsetDateTime,
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, price, image_key, image_url, category, is_featured, created_at
        FROM products
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_featured(db: &PgPool) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, price, image_key, image_url, category, is_featured, created_at
        FROM products
        WHERE is_featured
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    db: &PgPool,
    id: Uuid,
    name: &str,
    description: &str,
    price: sqlx::types::Decimal,
    image_key: Option<&str>,
    image_url: Option<&str>,
    category: &str,
) -> anyhow::Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (id, name, description, price, image_key, image_url, category)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, name, description, price, image_key, image_url, category, is_featured, created_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(image_key)
    .bind(image_url)
    .bind(category)
    .fetch_one(db)
    .await?;
    Ok(product)
}

/// Flip the featured flag, returning the updated row if the product exists.
pub async fn toggle_featured(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET is_featured = NOT is_featured
        WHERE id = $1
        RETURNING id, name, description, price, image_key, image_url, category, is_featured, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

/// Delete a product, returning its image key and featured flag so the
/// caller can clean up the image host and the featured cache.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<(Option<String>, bool)>> {
    let row = sqlx::query_as::<_, (Option<String>, bool)>(
        r#"
        DELETE FROM products
        WHERE id = $1
        RETURNING image_key, is_featured
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
