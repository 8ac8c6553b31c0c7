use async_trait::async_trait;
use deadpool_redis::redis::cmd;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

use crate::redis::operations::manager::{utf8_name, CacheError, CacheManager};
use crate::redis::pool::RedisPool;

/// 鍵空間操作接口
#[async_trait]
pub trait KeyspaceOperations: Send + Sync {
    /// 列出名稱包含 `fragment` 的所有鍵（去掉命名空間前綴）
    ///
    /// 使用遞增的 SCAN 遍歷，不會阻塞伺服器；遍歷期間新增或刪除的鍵可能不會出現在結果中。
    async fn keys_matching(&self, fragment: &str) -> Result<HashSet<String>, CacheError>;

    /// 清空伺服器上的所有鍵，不受命名空間限制且無法復原
    async fn flush_all(&self) -> Result<(), CacheError>;

    /// 執行PING命令
    async fn ping(&self) -> Result<String, CacheError>;
}

#[async_trait]
impl<P: RedisPool> KeyspaceOperations for CacheManager<P> {
    async fn keys_matching(&self, fragment: &str) -> Result<HashSet<String>, CacheError> {
        let pattern = self.namespace().contains_pattern(fragment);
        let started = Instant::now();

        let result: Result<HashSet<String>, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            let mut found = HashSet::new();
            let mut cursor: u64 = 0;

            loop {
                let (next, batch): (u64, Vec<Vec<u8>>) = cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(self.scan_count())
                    .query_async(&mut conn)
                    .await?;

                found.extend(batch.into_iter().filter_map(utf8_name).filter_map(|key| {
                    self.namespace().strip(&key).map(str::to_owned)
                }));

                if next == 0 {
                    break;
                }
                cursor = next;
            }

            debug!("SCAN {} 找到 {} 個鍵", pattern, found.len());
            Ok(found)
        }
        .await;

        self.finish("keys_matching", &pattern, started, result)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let started = Instant::now();

        let result: Result<(), CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            cmd("FLUSHALL").query_async::<()>(&mut conn).await?;
            warn!("已清空Redis中的所有鍵");
            Ok(())
        }
        .await;

        self.finish("flush_all", "*", started, result)
    }

    async fn ping(&self) -> Result<String, CacheError> {
        let started = Instant::now();

        let result: Result<String, CacheError> = async {
            let mut conn = self.pool().get_conn().await?;
            Ok(cmd("PING").query_async::<String>(&mut conn).await?)
        }
        .await;

        self.finish("ping", "", started, result)
    }
}
