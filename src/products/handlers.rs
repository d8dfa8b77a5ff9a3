use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::ApiError,
    state::AppState,
};

use super::dto::CreateProductRequest;
use super::repo::{self, Product};
use super::services::{featured_products, rebuild_featured_cache, upload_product_image};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/products/featured", get(get_featured))
}

pub fn authed_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", patch(toggle_featured).delete(delete_product))
}

#[instrument(skip_all, fields(user_id = %principal.id))]
async fn list_products(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(repo::list(&state.db).await?))
}

/// Public landing-page endpoint, served from the featured cache.
#[instrument(skip(state))]
async fn get_featured(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(featured_products(&state).await?))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Product name is required".into()));
    }
    if payload.price.is_sign_negative() {
        return Err(ApiError::Validation("Price must not be negative".into()));
    }

    let id = Uuid::new_v4();
    let mut image_key = None;
    let mut image_url = None;
    if let Some(image) = payload.image {
        let ct = payload.content_type.as_deref().unwrap_or("image/jpeg");
        let uploaded = upload_product_image(&state, id, Bytes::from(image.into_vec()), ct).await?;
        image_key = Some(uploaded.key);
        image_url = Some(uploaded.url);
    }

    let inserted = repo::insert(
        &state.db,
        id,
        payload.name.trim(),
        &payload.description,
        payload.price,
        image_key.as_deref(),
        image_url.as_deref(),
        &payload.category,
    )
    .await;

    let product = match inserted {
        Ok(product) => product,
        Err(e) => {
            // The row never landed; don't leave the uploaded image behind.
            if let Some(key) = image_key {
                if let Err(del) = state.storage.delete_object(&key).await {
                    warn!(error = %del, key = %key, "failed to clean up uploaded image");
                }
            }
            return Err(e.into());
        }
    };

    info!(product_id = %product.id, name = %product.name, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Toggling rebuilds the featured cache so the public list reflects the
/// change immediately.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
async fn toggle_featured(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = repo::toggle_featured(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    rebuild_featured_cache(&state).await?;

    info!(product_id = %id, is_featured = product.is_featured, "featured flag toggled");
    Ok(Json(product))
}

#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (image_key, was_featured) = repo::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    // Image-host cleanup is best-effort; the row is already gone.
    if let Some(key) = image_key {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, key = %key, "failed to delete product image");
        }
    }

    if was_featured {
        if let Err(e) = rebuild_featured_cache(&state).await {
            error!(error = %e, "failed to rebuild featured cache after delete");
        }
    }

    info!(product_id = %id, "product deleted");
    Ok(Json(serde_json::json!({ "message": "Product deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{Principal, ROLE_ADMIN};
    use crate::storage::StorageClient;
    use axum::async_trait;
    use sqlx::PgPool;
    use std::sync::{Arc, Mutex};
    use time::OffsetDateTime;

    #[derive(Default)]
    struct RecordingStorage {
        puts: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StorageClient for RecordingStorage {
        async fn put_object(&self, key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<()> {
            self.puts.lock().unwrap().push(key.to_string());
            Ok(())
        }
        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }
        fn object_url(&self, key: &str) -> String {
            format!("https://img.test/{}", key)
        }
    }

    fn admin() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Root".into(),
            email: "root@x.com".into(),
            role: ROLE_ADMIN.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[sqlx::test]
    async fn failed_insert_removes_uploaded_image(pool: PgPool) {
        // Break the insert after the upload has already happened.
        sqlx::query("ALTER TABLE products DROP COLUMN category")
            .execute(&pool)
            .await
            .expect("alter");

        let storage = Arc::new(RecordingStorage::default());
        let fake = AppState::fake();
        let state = AppState::from_parts(
            pool,
            fake.config.clone(),
            fake.cache.clone(),
            storage.clone(),
        );

        let payload = CreateProductRequest {
            name: "jacket".into(),
            description: String::new(),
            price: sqlx::types::Decimal::new(4999, 2),
            category: String::new(),
            image: Some(serde_bytes::ByteBuf::from(vec![1, 2, 3])),
            content_type: Some("image/png".into()),
        };

        let result = create_product(State(state), AdminUser(admin()), Json(payload)).await;
        assert!(result.is_err());

        let puts = storage.puts.lock().unwrap().clone();
        let deletes = storage.deletes.lock().unwrap().clone();
        assert_eq!(puts.len(), 1, "image was uploaded before the insert");
        assert_eq!(deletes, puts, "the uploaded key was removed again");
    }
}
