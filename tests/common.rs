use cache_facade::config::{CacheConfig, RedisConfig};
use cache_facade::redis::{CacheManager, ConnectionPool, RedisPool};

/// 測試用 Redis URL，可用 REDIS_TEST_URL 覆蓋
pub fn redis_url() -> String {
    std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| {
        // Docker 環境使用服務名稱
        if std::path::Path::new("/.dockerenv").exists() {
            "redis://redis:6379".to_string()
        } else {
            "redis://localhost:6379".to_string()
        }
    })
}

pub fn redis_config() -> RedisConfig {
    RedisConfig {
        url: redis_url(),
        max_total: 4,
        max_idle: 4,
        wait_timeout_ms: 2_000,
        connection_timeout_secs: 2,
        ..RedisConfig::default()
    }
}

/// 建立測試快取；Redis 不可用時返回 None
pub async fn setup_cache(test_name: &str) -> Option<CacheManager<ConnectionPool>> {
    let pool = ConnectionPool::new(redis_config()).await.ok()?;
    if !pool.check_health().await {
        eprintln!("跳過 {} - Redis 不可用", test_name);
        return None;
    }

    let cache_config = CacheConfig {
        key_prefix: format!("cache_facade_it:{}:", test_name),
        default_ttl_secs: 60,
        ..CacheConfig::default()
    };
    Some(CacheManager::with_config(pool, &cache_config))
}
