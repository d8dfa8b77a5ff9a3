use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::products::repo::Product;

/// One cart line: a product snapshot joined with its quantity. Insertion
/// order is preserved through `added_at`.
#[derive(Debug, Serialize, FromRow)]
pub struct CartLine {
    #[sqlx(flatten)]
    pub product: Product,
    pub quantity: i32,
}

/// Add one unit of a product. The upsert increments atomically, so a
/// concurrent add for the same line cannot be lost.
pub async fn add(db: &PgPool, user_id: Uuid, product_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_items (user_id, product_id, quantity)
        VALUES ($1, $2, 1)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + 1
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(db)
    .await?;
    Ok(())
}

/// The join is against live products only; the FK cascade removes lines for
/// deleted products, so no orphaned reference ever reaches the client.
pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT p.id, p.name, p.description, p.price, p.image_key, p.image_url,
               p.category, p.is_featured, p.created_at,
               ci.quantity
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.added_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Quantity 0 removes the line; a positive quantity overwrites it. Returns
/// false when no line exists for the product.
pub async fn update_quantity(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<bool> {
    let result = if quantity == 0 {
        sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .execute(db)
        .await?
    } else {
        sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $3
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(db)
        .await?
    };
    Ok(result.rows_affected() > 0)
}

/// With a product id, removes that line; without one, empties the cart.
/// Both are idempotent.
pub async fn clear(db: &PgPool, user_id: Uuid, product_id: Option<Uuid>) -> anyhow::Result<()> {
    match product_id {
        Some(product_id) => {
            sqlx::query(
                r#"
                DELETE FROM cart_items
                WHERE user_id = $1 AND product_id = $2
                "#,
            )
            .bind(user_id)
            .bind(product_id)
            .execute(db)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                DELETE FROM cart_items
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .execute(db)
            .await?;
        }
    }
    Ok(())
}
