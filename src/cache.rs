use anyhow::Context;
use axum::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

/// Key-value store for revocable session references and the featured-product
/// cache. Keys written with a TTL expire server-side; keys without one live
/// until explicitly refreshed or deleted.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url).context("redis client")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("redis connect")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn put(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        match ttl_secs {
            Some(secs) => {
                let _: () = conn.set_ex(key, value, secs).await.context("redis set_ex")?;
            }
            None => {
                let _: () = conn.set(key, value).await.context("redis set")?;
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.context("redis get")?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.context("redis del")?;
        Ok(())
    }
}
