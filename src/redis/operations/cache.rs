use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::redis::operations::manager::{checked_ttl, CacheError, CacheManager};
use crate::redis::pool::RedisPool;

/// 鍵值快取操作接口
#[async_trait]
pub trait CacheOperations: Send + Sync {
    /// 以預設存活時間存儲值
    async fn save<K, V>(&self, key: K, value: &V) -> Result<(), CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: Serialize + ?Sized + Send + Sync;

    /// 以指定存活時間存儲值，值與過期時間在同一條命令中寫入
    async fn save_with_ttl<K, V>(&self, key: K, value: &V, ttl_secs: u64) -> Result<(), CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: Serialize + ?Sized + Send + Sync;

    /// 從快取獲取值，鍵不存在時返回 `Ok(None)`
    async fn get<K, V>(&self, key: K) -> Result<Option<V>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Send;

    /// 刪除多個鍵，返回實際刪除的數量
    async fn delete<K>(&self, keys: &[K]) -> Result<u64, CacheError>
    where
        K: AsRef<str> + Send + Sync;

    /// 刪除單個鍵，返回鍵是否存在
    async fn delete_one<K>(&self, key: K) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync;

    /// 移除鍵的過期時間，使其永久保存；返回是否移除了過期時間
    async fn remove_ttl<K>(&self, key: K) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync;

    /// 設置鍵的過期時間，鍵不存在時返回 `Ok(false)`
    async fn expire<K>(&self, key: K, ttl_secs: u64) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync;

    /// 剩餘存活秒數；鍵不存在或沒有過期時間時返回 `Ok(None)`
    async fn ttl<K>(&self, key: K) -> Result<Option<u64>, CacheError>
    where
        K: AsRef<str> + Send + Sync;

    /// 檢查快取中是否存在鍵
    async fn exists<K>(&self, key: K) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync;

    /// 從快取獲取值，如果不存在則使用提供的函數生成並寫回
    async fn get_or_set<K, V, F, Fut>(
        &self,
        key: K,
        ttl_secs: Option<u64>,
        generator: F,
    ) -> Result<V, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Serialize + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = Result<V, CacheError>> + Send;
}

#[async_trait]
impl<P: RedisPool> CacheOperations for CacheManager<P> {
    async fn save<K, V>(&self, key: K, value: &V) -> Result<(), CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: Serialize + ?Sized + Send + Sync,
    {
        self.save_with_ttl(key, value, self.default_ttl_secs()).await
    }

    async fn save_with_ttl<K, V>(&self, key: K, value: &V, ttl_secs: u64) -> Result<(), CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: Serialize + ?Sized + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<(), CacheError> = async {
            let ttl = checked_ttl(ttl_secs)?;
            let bytes = self.encode(value)?;
            let mut conn = self.pool().get_conn().await?;

            conn.set_ex::<_, _, ()>(&full_key, bytes, ttl).await?;
            debug!("快取設置成功: {} (TTL {}秒)", full_key, ttl);
            Ok(())
        }
        .await;

        self.finish("save", &full_key, started, result)
    }

    async fn get<K, V>(&self, key: K) -> Result<Option<V>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Send,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<Option<V>, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            let bytes: Option<Vec<u8>> = conn.get(&full_key).await?;
            bytes.map(|bytes| self.decode(&bytes)).transpose()
        }
        .await;

        self.finish_lookup("get", &full_key, started, result)
    }

    async fn delete<K>(&self, keys: &[K]) -> Result<u64, CacheError>
    where
        K: AsRef<str> + Send + Sync,
    {
        if keys.is_empty() {
            return Ok(0);
        }

        let full_keys: Vec<String> = keys.iter().map(|key| self.full_key(key)).collect();
        let target = full_keys.join(",");
        let started = Instant::now();

        let result: Result<u64, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            let deleted: u64 = conn.del(&full_keys).await?;
            debug!("快取刪除 {} 個鍵中的 {} 個", full_keys.len(), deleted);
            Ok(deleted)
        }
        .await;

        self.finish("delete", &target, started, result)
    }

    async fn delete_one<K>(&self, key: K) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
    {
        Ok(self.delete(&[key]).await? == 1)
    }

    async fn remove_ttl<K>(&self, key: K) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<bool, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            Ok(conn.persist(&full_key).await?)
        }
        .await;

        self.finish("remove_ttl", &full_key, started, result)
    }

    async fn expire<K>(&self, key: K, ttl_secs: u64) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<bool, CacheError> = async {
            let ttl = checked_ttl(ttl_secs)?;
            let mut conn = self.pool().get_conn().await?;
            let set: bool = conn.expire(&full_key, ttl as i64).await?;
            debug!(
                "快取過期時間設置 {}: {} ({}秒)",
                full_key,
                if set { "成功" } else { "鍵不存在" },
                ttl
            );
            Ok(set)
        }
        .await;

        self.finish("expire", &full_key, started, result)
    }

    async fn ttl<K>(&self, key: K) -> Result<Option<u64>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<Option<u64>, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            // -2 表示鍵不存在，-1 表示沒有過期時間
            let remaining: i64 = conn.ttl(&full_key).await?;
            Ok(u64::try_from(remaining).ok())
        }
        .await;

        self.finish_lookup("ttl", &full_key, started, result)
    }

    async fn exists<K>(&self, key: K) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<bool, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            Ok(conn.exists(&full_key).await?)
        }
        .await;

        self.finish("exists", &full_key, started, result)
    }

    async fn get_or_set<K, V, F, Fut>(
        &self,
        key: K,
        ttl_secs: Option<u64>,
        generator: F,
    ) -> Result<V, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Serialize + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = Result<V, CacheError>> + Send,
    {
        // 先嘗試從快取獲取，讀取失敗時不執行生成函數
        if let Some(value) = self.get::<_, V>(&key).await? {
            return Ok(value);
        }

        debug!("快取未命中(get_or_set)，執行生成函數: {}", key.as_ref());
        let value = generator().await?;

        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs());
        self.save_with_ttl(&key, &value, ttl).await?;

        Ok(value)
    }
}
