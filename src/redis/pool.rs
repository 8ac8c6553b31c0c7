use crate::config::types::RedisConfig;
use async_trait::async_trait;
use deadpool::managed::QueueMode;
use deadpool_redis::{
    redis::{cmd, RedisError},
    Config, Connection, CreatePoolError, Pool, PoolConfig, PoolError, Runtime, Timeouts,
};
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Redis連接池錯誤
#[derive(Error, Debug)]
pub enum RedisPoolError {
    /// 連接池初始化錯誤
    #[error("Redis連接池初始化錯誤: {0}")]
    PoolInit(String),

    /// 無法獲取連接（連接池耗盡、等待超時或無法建立連接）
    #[error("無法從連接池獲取連接: {0}")]
    GetConnection(String),

    /// 借用時的PING驗證失敗
    #[error("連接驗證失敗: {0}")]
    Validation(String),

    /// 連接池已關閉
    #[error("Redis連接池已關閉")]
    Closed,

    /// Redis原生錯誤
    #[error("Redis原生錯誤: {0}")]
    Native(#[from] RedisError),
}

/// 從deadpool-redis錯誤轉換為RedisPoolError
impl From<PoolError> for RedisPoolError {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::Closed => RedisPoolError::Closed,
            other => RedisPoolError::GetConnection(other.to_string()),
        }
    }
}

/// 從deadpool-redis創建錯誤轉換為RedisPoolError
impl From<CreatePoolError> for RedisPoolError {
    fn from(error: CreatePoolError) -> Self {
        RedisPoolError::PoolInit(error.to_string())
    }
}

/// 連接池狀態快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// 配置的連接上限
    pub max_size: usize,
    /// 目前存在的連接數
    pub size: usize,
    /// 閒置可用的連接數
    pub available: usize,
    /// 正在等待連接的請求數
    pub waiting: usize,
}

/// Redis連接池接口
///
/// 每次調用借出一條獨立的連接，連接在 drop 時自動歸還。
#[async_trait]
pub trait RedisPool: Send + Sync + 'static {
    /// 獲取連接
    async fn get_conn(&self) -> Result<Connection, RedisPoolError>;

    /// 檢查連接池健康狀態
    async fn check_health(&self) -> bool;

    /// 獲取連接池大小上限
    fn pool_size(&self) -> u32;

    /// 獲取連接池目前狀態
    fn status(&self) -> PoolStatus;
}

/// Redis連接池實現
///
/// 顯式建立、顯式關閉；可同時存在多個不同配置的實例。
pub struct ConnectionPool {
    pool: Pool,
    config: RedisConfig,
    evictor: Option<JoinHandle<()>>,
}

impl ConnectionPool {
    /// 創建新的Redis連接池
    ///
    /// 建立連接池本身不會連線；第一次借用時才建立連接。
    /// 回收任務需要在 Tokio runtime 中調用。
    pub async fn new(config: RedisConfig) -> Result<Self, RedisPoolError> {
        let mut cfg = Config::from_url(&config.url);

        // 設置連接池大小和超時
        cfg.pool = Some(PoolConfig {
            max_size: config.max_total as usize,
            timeouts: Timeouts {
                wait: Some(config.wait_timeout()),
                create: Some(config.connection_timeout()),
                recycle: Some(config.connection_timeout()),
            },
            queue_mode: QueueMode::Fifo,
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        let evictor = config.eviction_interval().map(|interval| {
            spawn_evictor(
                pool.clone(),
                interval,
                config.min_evictable_idle(),
                config.max_idle as usize,
            )
        });

        info!(
            "Redis連接池初始化完成，上限: {}，閒置上限: {}",
            config.max_total, config.max_idle
        );

        Ok(Self {
            pool,
            config,
            evictor,
        })
    }

    /// 使用的配置
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// 立即執行一次閒置連接回收，返回被移除的連接數
    pub fn evict_idle(&self) -> usize {
        evict_idle_connections(
            &self.pool,
            self.config.min_evictable_idle(),
            self.config.max_idle as usize,
        )
    }

    /// 關閉連接池
    ///
    /// 停止回收任務並釋放所有閒置連接，之後的借用返回 [`RedisPoolError::Closed`]。
    pub fn close(&self) {
        if let Some(handle) = &self.evictor {
            handle.abort();
        }
        self.pool.close();
        info!("Redis連接池已關閉");
    }

    /// 連接池是否已關閉
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// PING 驗證剛借出的連接，失敗時把連接移出連接池
    async fn validate(&self, mut conn: Connection) -> Result<Connection, RedisError> {
        let result: Result<String, RedisError> = cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(_) => Ok(conn),
            Err(e) => {
                // 取出底層連接後 drop，連接不會回到連接池，也不再佔用名額
                drop(Connection::take(conn));
                Err(e)
            }
        }
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        if let Some(handle) = &self.evictor {
            handle.abort();
        }
    }
}

/// 移除閒置過久或超出閒置上限的連接
fn evict_idle_connections(pool: &Pool, min_evictable_idle: Duration, max_idle: usize) -> usize {
    let kept = Cell::new(0usize);
    let result = pool.retain(|_, metrics| {
        if metrics.last_used() >= min_evictable_idle {
            return false;
        }
        if kept.get() >= max_idle {
            return false;
        }
        kept.set(kept.get() + 1);
        true
    });
    result.removed.len()
}

fn spawn_evictor(
    pool: Pool,
    interval: Duration,
    min_evictable_idle: Duration,
    max_idle: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // 第一個 tick 立即完成
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }

            let removed = evict_idle_connections(&pool, min_evictable_idle, max_idle);
            if removed > 0 {
                debug!("回收了 {} 條閒置Redis連接", removed);
            }
        }
    })
}

#[async_trait]
impl RedisPool for ConnectionPool {
    /// 借出連接
    ///
    /// 開啟 `test_on_borrow` 時，驗證失敗的連接會被丟棄並重新借用，
    /// 直到 `wait_timeout_ms` 用完才返回 [`RedisPoolError::Validation`]。
    /// deadpool 回收閒置連接時已經會 PING 一次，這裡的 PING 另外涵蓋新建立的連接，
    /// 代價是每次借用多一次往返。
    async fn get_conn(&self) -> Result<Connection, RedisPoolError> {
        let deadline = Instant::now() + self.config.wait_timeout();

        loop {
            let conn = match self.pool.get().await {
                Ok(conn) => {
                    debug!("從Redis連接池獲取連接成功");
                    conn
                }
                Err(e) => {
                    error!("無法從Redis連接池獲取連接: {}", e);
                    return Err(e.into());
                }
            };

            if !self.config.test_on_borrow {
                return Ok(conn);
            }

            match self.validate(conn).await {
                Ok(conn) => return Ok(conn),
                Err(e) if Instant::now() < deadline => {
                    warn!("借用的Redis連接驗證失敗，丟棄後重新借用: {}", e);
                }
                Err(e) => {
                    error!("在等待時間內找不到可用的Redis連接: {}", e);
                    return Err(RedisPoolError::Validation(e.to_string()));
                }
            }
        }
    }

    async fn check_health(&self) -> bool {
        match self.pool.get().await {
            Ok(mut conn) => {
                // 直接執行 PING 命令
                let result: Result<String, RedisError> = cmd("PING").query_async(&mut conn).await;
                match result {
                    Ok(pong) => pong == "PONG",
                    Err(e) => {
                        error!("Redis健康檢查錯誤: {}", e);
                        false
                    }
                }
            }
            Err(e) => {
                error!("Redis健康檢查無法獲取連接: {}", e);
                false
            }
        }
    }

    fn pool_size(&self) -> u32 {
        self.config.max_total
    }

    fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }
}

/// Arc<ConnectionPool> 也實現 RedisPool trait，便於共享連接池
#[async_trait]
impl RedisPool for Arc<ConnectionPool> {
    async fn get_conn(&self) -> Result<Connection, RedisPoolError> {
        (**self).get_conn().await
    }

    async fn check_health(&self) -> bool {
        (**self).check_health().await
    }

    fn pool_size(&self) -> u32 {
        (**self).pool_size()
    }

    fn status(&self) -> PoolStatus {
        (**self).status()
    }
}
