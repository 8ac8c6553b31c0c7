use crate::config::types::CacheConfig;
use crate::redis::codec::{Codec, CodecError};
use crate::redis::keys::KeyNamespace;
use crate::redis::metrics::{FacadeMetrics, Outcome};
use crate::redis::pool::{RedisPool, RedisPoolError};
use deadpool_redis::redis::RedisError;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error};

/// 快取操作錯誤
///
/// 「鍵不存在」不是錯誤：查詢類操作以 `Ok(None)`、`Ok(false)` 或空集合表示。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 無法借用連接
    #[error("Redis連接錯誤: {0}")]
    Connection(#[from] RedisPoolError),

    /// Redis命令錯誤
    #[error("Redis操作錯誤: {0}")]
    Redis(#[from] RedisError),

    /// 值序列化或反序列化錯誤
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// 存活時間必須為正數
    #[error("無效的存活時間: {0}秒")]
    InvalidTtl(u64),
}

impl CacheError {
    /// 是否為連接層面的失敗（連接池耗盡、網路中斷、超時）
    pub fn is_connection_failure(&self) -> bool {
        match self {
            CacheError::Connection(_) => true,
            CacheError::Redis(e) => e.is_io_error() || e.is_connection_dropped() || e.is_timeout(),
            _ => false,
        }
    }
}

/// 快取外觀
///
/// 持有注入的連接池，本身不保存任何快取狀態，可以安全地在多個任務間共享。
pub struct CacheManager<P: RedisPool> {
    pool: P,
    namespace: KeyNamespace,
    codec: Codec,
    default_ttl_secs: u64,
    scan_count: u32,
}

impl<P: RedisPool> CacheManager<P> {
    /// 使用預設快取配置創建快取管理器
    pub fn new(pool: P) -> Self {
        Self::with_config(pool, &CacheConfig::default())
    }

    /// 創建新的快取管理器
    pub fn with_config(pool: P, config: &CacheConfig) -> Self {
        Self {
            pool,
            namespace: KeyNamespace::new(config.key_prefix.clone()),
            codec: config.codec.into(),
            default_ttl_secs: config.default_ttl_secs,
            scan_count: config.scan_count,
        }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub(crate) fn scan_count(&self) -> u32 {
        self.scan_count
    }

    /// 生成帶命名空間前綴的鍵
    pub(crate) fn full_key<K: AsRef<str>>(&self, key: K) -> String {
        self.namespace.key(key)
    }

    /// 結束一次操作：記錄指標，失敗時寫錯誤日誌
    pub(crate) fn finish<T>(
        &self,
        operation: &'static str,
        target: &str,
        started: Instant,
        result: Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        let outcome = match &result {
            Ok(_) => {
                debug!(operation, key = target, "快取操作成功");
                Outcome::Ok
            }
            Err(e) => {
                error!(operation, key = target, "快取操作失敗: {}", e);
                Outcome::Error
            }
        };
        FacadeMetrics::record(operation, outcome, started.elapsed());
        result
    }

    /// 結束一次查詢操作，區分命中與未命中
    pub(crate) fn finish_lookup<T>(
        &self,
        operation: &'static str,
        target: &str,
        started: Instant,
        result: Result<Option<T>, CacheError>,
    ) -> Result<Option<T>, CacheError> {
        let outcome = match &result {
            Ok(Some(_)) => {
                debug!(operation, key = target, "快取命中");
                Outcome::Hit
            }
            Ok(None) => {
                debug!(operation, key = target, "快取未命中");
                Outcome::Miss
            }
            Err(e) => {
                error!(operation, key = target, "快取讀取失敗: {}", e);
                Outcome::Error
            }
        };
        FacadeMetrics::record(operation, outcome, started.elapsed());
        result
    }

    /// 編碼值
    pub(crate) fn encode<V: serde::Serialize + ?Sized>(
        &self,
        value: &V,
    ) -> Result<Vec<u8>, CacheError> {
        Ok(self.codec.encode(value)?)
    }

    /// 解碼值
    pub(crate) fn decode<V: serde::de::DeserializeOwned>(
        &self,
        bytes: &[u8],
    ) -> Result<V, CacheError> {
        Ok(self.codec.decode(bytes)?)
    }
}

/// 檢查存活時間，0 會讓 Redis 立即刪除鍵或拒絕命令
pub(crate) fn checked_ttl(ttl_secs: u64) -> Result<u64, CacheError> {
    if ttl_secs == 0 || ttl_secs > i64::MAX as u64 {
        return Err(CacheError::InvalidTtl(ttl_secs));
    }
    Ok(ttl_secs)
}

/// 把伺服器返回的鍵名或欄位名轉成字串，非 UTF-8 的名稱略過
///
/// 其他客戶端可能寫入二進位鍵名，單一名稱無法解碼不應讓整個查詢失敗。
pub(crate) fn utf8_name(raw: Vec<u8>) -> Option<String> {
    match String::from_utf8(raw) {
        Ok(name) => Some(name),
        Err(e) => {
            debug!("略過非UTF-8名稱: {:?}", e.as_bytes());
            None
        }
    }
}
