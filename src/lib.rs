//! 以連接池為基礎的 Redis 快取外觀。
//!
//! ```no_run
//! use cache_facade::config::{CacheConfig, RedisConfig};
//! use cache_facade::redis::{CacheManager, CacheOperations, ConnectionPool};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ConnectionPool::new(RedisConfig::default()).await?;
//! let cache = CacheManager::with_config(pool, &CacheConfig::default());
//!
//! cache.save("greeting", "hello").await?;
//! let value: Option<String> = cache.get("greeting").await?;
//! assert_eq!(value.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

// 模組定義
pub mod config;
pub mod logging;
pub mod redis;
