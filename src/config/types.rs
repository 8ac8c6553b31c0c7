use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 支援的 Redis URL scheme
const REDIS_URL_SCHEMES: [&str; 4] = ["redis://", "rediss://", "redis+unix://", "unix://"];

/// 應用程序配置結構
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub log: LogConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證各個部分的配置
        self.log.validate()?;
        self.redis.validate()?;
        self.cache.validate()?;

        Ok(())
    }
}

/// 日誌輸出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// 每日輪替的日誌文件路徑，未設定時只輸出到終端
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證日誌級別
        ValidationUtils::one_of(
            &self.level.to_lowercase().as_str(),
            &["trace", "debug", "info", "warn", "error"],
            "log.level",
        )?;

        if let Some(file) = &self.file {
            ValidationUtils::not_empty(file, "log.file")?;
        }

        Ok(())
    }
}

/// Redis 連接池配置
///
/// 預設值沿用舊有部署的設定：最多 8 條連接、借用等待 100 秒、
/// 每 30 秒回收閒置超過 60 秒的連接。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    /// 連接總數上限（借出 + 閒置）
    pub max_total: u32,
    /// 回收後保留的閒置連接上限
    ///
    /// 只在回收任務執行或顯式調用 `ConnectionPool::evict_idle` 時生效；
    /// `eviction_interval_ms = 0` 時閒置連接可以一直保留到 `max_total`。
    pub max_idle: u32,
    /// 借用連接的最長等待時間（毫秒），也限制驗證失敗後重新借用的時間
    pub wait_timeout_ms: u64,
    /// 建立與回收連接的超時（秒）
    pub connection_timeout_secs: u64,
    /// 借用時先 PING 驗證連接，失敗的連接被丟棄並重新借用
    pub test_on_borrow: bool,
    /// 閒置多久的連接可被回收（毫秒）
    pub min_evictable_idle_ms: u64,
    /// 回收任務執行間隔（毫秒），0 表示停用
    pub eviction_interval_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_total: 8,
            max_idle: 8,
            wait_timeout_ms: 100_000,
            connection_timeout_secs: 5,
            test_on_borrow: true,
            min_evictable_idle_ms: 60_000,
            eviction_interval_ms: 30_000,
        }
    }
}

impl RedisConfig {
    /// 借用連接的等待時間
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// 建立連接的超時
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// 閒置回收門檻
    pub fn min_evictable_idle(&self) -> Duration {
        Duration::from_millis(self.min_evictable_idle_ms)
    }

    /// 回收任務間隔，停用時為 None
    pub fn eviction_interval(&self) -> Option<Duration> {
        (self.eviction_interval_ms > 0).then(|| Duration::from_millis(self.eviction_interval_ms))
    }
}

impl Validator for RedisConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證Redis配置
        ValidationUtils::not_empty(&self.url, "redis.url")?;
        if !REDIS_URL_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ValidationError::InvalidValue(format!(
                "redis.url 必須以 {:?} 之一開頭: {}",
                REDIS_URL_SCHEMES, self.url
            )));
        }
        ValidationUtils::in_range(self.max_total, 1, 1024, "redis.max_total")?;
        ValidationUtils::in_range(self.max_idle, 0, self.max_total, "redis.max_idle")?;
        ValidationUtils::in_range(self.wait_timeout_ms, 1, 600_000, "redis.wait_timeout_ms")?;
        ValidationUtils::in_range(
            self.connection_timeout_secs,
            1,
            60,
            "redis.connection_timeout_secs",
        )?;

        Ok(())
    }
}

/// 值的序列化格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    Bincode,
}

/// 快取外觀配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `save` 未指定 TTL 時使用的存活時間（秒）
    pub default_ttl_secs: u64,
    /// 所有鍵的命名空間前綴
    pub key_prefix: String,
    pub codec: CodecKind,
    /// 每次 SCAN 的 COUNT 提示
    pub scan_count: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60 * 60,
            key_prefix: String::new(),
            codec: CodecKind::Json,
            scan_count: 100,
        }
    }
}

impl Validator for CacheConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::in_range(
            self.default_ttl_secs,
            1,
            u64::from(u32::MAX),
            "cache.default_ttl_secs",
        )?;
        ValidationUtils::in_range(self.scan_count, 1, 100_000, "cache.scan_count")?;

        Ok(())
    }
}
