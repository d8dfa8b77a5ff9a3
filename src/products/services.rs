use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use super::repo::{self, Product};
use crate::{cache::CacheClient, state::AppState};

/// Serialized featured-product list. No TTL: rebuilt explicitly whenever a
/// featured flag changes or a featured product is deleted.
pub const FEATURED_CACHE_KEY: &str = "featured_products";

pub struct UploadedImage {
    pub key: String,
    pub url: String,
}

pub async fn upload_product_image(
    state: &AppState,
    product_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<UploadedImage> {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("products/{}-{}.{}", product_id, Uuid::new_v4(), ext);
    state
        .storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    let url = state.storage.object_url(&key);
    Ok(UploadedImage { key, url })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub async fn cached_featured(cache: &dyn CacheClient) -> anyhow::Result<Option<Vec<Product>>> {
    match cache.get(FEATURED_CACHE_KEY).await? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(products) => Ok(Some(products)),
            Err(e) => {
                // Treat an unreadable entry as a miss; it gets rewritten.
                warn!(error = %e, "featured cache entry corrupt");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub async fn store_featured(cache: &dyn CacheClient, products: &[Product]) -> anyhow::Result<()> {
    let raw = serde_json::to_string(products)?;
    cache.put(FEATURED_CACHE_KEY, &raw, None).await
}

/// Read-through: serve the cached list when present, otherwise query and
/// populate the cache.
pub async fn featured_products(state: &AppState) -> anyhow::Result<Vec<Product>> {
    if let Some(products) = cached_featured(state.cache.as_ref()).await? {
        return Ok(products);
    }
    let products = repo::list_featured(&state.db).await?;
    store_featured(state.cache.as_ref(), &products).await?;
    Ok(products)
}

pub async fn rebuild_featured_cache(state: &AppState) -> anyhow::Result<()> {
    let products = repo::list_featured(&state.db).await?;
    store_featured(state.cache.as_ref(), &products).await
}
