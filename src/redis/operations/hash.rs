use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::redis::operations::manager::{utf8_name, CacheError, CacheManager};
use crate::redis::pool::RedisPool;

/// 雜湊欄位操作接口
///
/// 鍵帶命名空間前綴，欄位名稱原樣存放；欄位值經過編解碼器。
#[async_trait]
pub trait HashOperations: Send + Sync {
    /// 設置雜湊欄位，返回欄位是否為新建
    async fn hash_set<K, F, V>(&self, key: K, field: F, value: &V) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        F: AsRef<str> + Send + Sync,
        V: Serialize + ?Sized + Send + Sync;

    /// 讀取雜湊欄位，鍵或欄位不存在時返回 `Ok(None)`
    async fn hash_get<K, F, V>(&self, key: K, field: F) -> Result<Option<V>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        F: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Send;

    /// 刪除雜湊欄位，恰好刪除一個欄位時返回 `true`
    async fn hash_delete<K, F>(&self, key: K, field: F) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        F: AsRef<str> + Send + Sync;

    /// 讀取雜湊的所有欄位，鍵不存在時返回空表
    async fn hash_get_all<K, V>(&self, key: K) -> Result<HashMap<String, V>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Send;
}

#[async_trait]
impl<P: RedisPool> HashOperations for CacheManager<P> {
    async fn hash_set<K, F, V>(&self, key: K, field: F, value: &V) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        F: AsRef<str> + Send + Sync,
        V: Serialize + ?Sized + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<bool, CacheError> = async {
            let bytes = self.encode(value)?;
            let mut conn = self.pool().get_conn().await?;
            let added: u64 = conn.hset(&full_key, field.as_ref(), bytes).await?;
            Ok(added == 1)
        }
        .await;

        self.finish("hash_set", &full_key, started, result)
    }

    async fn hash_get<K, F, V>(&self, key: K, field: F) -> Result<Option<V>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        F: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Send,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<Option<V>, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            let bytes: Option<Vec<u8>> = conn.hget(&full_key, field.as_ref()).await?;
            bytes.map(|bytes| self.decode(&bytes)).transpose()
        }
        .await;

        self.finish_lookup("hash_get", &full_key, started, result)
    }

    async fn hash_delete<K, F>(&self, key: K, field: F) -> Result<bool, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        F: AsRef<str> + Send + Sync,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<bool, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            let removed: u64 = conn.hdel(&full_key, field.as_ref()).await?;
            Ok(removed == 1)
        }
        .await;

        self.finish("hash_delete", &full_key, started, result)
    }

    async fn hash_get_all<K, V>(&self, key: K) -> Result<HashMap<String, V>, CacheError>
    where
        K: AsRef<str> + Send + Sync,
        V: DeserializeOwned + Send,
    {
        let full_key = self.full_key(&key);
        let started = Instant::now();

        let result: Result<HashMap<String, V>, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            let raw: HashMap<Vec<u8>, Vec<u8>> = conn.hgetall(&full_key).await?;
            raw.into_iter()
                .filter_map(|(field, bytes)| utf8_name(field).map(|field| (field, bytes)))
                .map(|(field, bytes)| self.decode(&bytes).map(|value| (field, value)))
                .collect()
        }
        .await;

        self.finish("hash_get_all", &full_key, started, result)
    }
}
