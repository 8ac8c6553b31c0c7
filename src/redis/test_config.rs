//! 集中化的 Redis 測試配置
//!
//! 提供一致的測試環境配置，支援不同部署環境（本地開發、Docker 容器）

use crate::config::types::{CacheConfig, RedisConfig};
use crate::redis::pool::{ConnectionPool, RedisPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Redis 測試配置建構器
pub struct RedisTestConfig;

impl RedisTestConfig {
    /// 獲取測試用 Redis URL
    ///
    /// 優先級：
    /// 1. REDIS_TEST_URL 環境變數
    /// 2. 檢測 Docker 環境使用 redis:6379
    /// 3. 預設 localhost:6379
    pub fn get_test_url() -> String {
        if let Ok(url) = std::env::var("REDIS_TEST_URL") {
            return url;
        }

        if Self::is_docker_environment() {
            "redis://redis:6379".to_string()
        } else {
            "redis://localhost:6379".to_string()
        }
    }

    /// 檢測是否在 Docker 環境中執行
    fn is_docker_environment() -> bool {
        std::env::var("DOCKER_CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists()
    }

    /// 建立標準測試 Redis 配置
    pub fn create_test_config() -> RedisConfig {
        RedisConfig {
            url: Self::get_test_url(),
            max_total: 3,
            max_idle: 3,
            wait_timeout_ms: 2_000,
            connection_timeout_secs: 2,
            ..RedisConfig::default()
        }
    }

    /// 指向沒有服務監聽的位址，用於驗證失敗路徑
    pub fn unreachable_config() -> RedisConfig {
        RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            max_total: 2,
            max_idle: 2,
            wait_timeout_ms: 500,
            connection_timeout_secs: 1,
            eviction_interval_ms: 0,
            ..RedisConfig::default()
        }
    }

    /// 每個測試使用獨立的鍵前綴，避免並行測試互相干擾
    pub fn cache_config(test_name: &str) -> CacheConfig {
        CacheConfig {
            key_prefix: format!("cache_facade_test:{}:", test_name),
            default_ttl_secs: 60,
            ..CacheConfig::default()
        }
    }

    /// 檢查 Redis 是否可用於測試
    pub async fn is_redis_available() -> bool {
        match ConnectionPool::new(Self::create_test_config()).await {
            Ok(pool) => pool.check_health().await,
            Err(_) => false,
        }
    }

    /// Redis 不可用時跳過測試
    ///
    /// 可用時返回測試配置，否則印出提示並返回 None。
    pub async fn skip_if_redis_unavailable(test_name: &str) -> Option<RedisConfig> {
        if Self::is_redis_available().await {
            Some(Self::create_test_config())
        } else {
            println!("跳過Redis測試 '{}' - 無Redis環境可用", test_name);
            None
        }
    }
}

/// 回應固定資料的最小 RESP2 服務
///
/// 用於在沒有真實 Redis 的情況下驗證連接池行為和二進位鍵名的處理。
/// SCAN 忽略 MATCH 參數、一次返回全部 `keys`；HGETALL 不分鍵名返回 `hash_entries`；
/// 其餘未知命令一律回覆 `+OK`。
#[derive(Debug, Clone, Default)]
pub struct FakeRedisData {
    pub keys: Vec<Vec<u8>>,
    pub hash_entries: Vec<(Vec<u8>, Vec<u8>)>,
    /// 前幾條被接受的連接對 PING 回覆錯誤
    pub failing_ping_connections: usize,
}

pub struct FakeRedisServer {
    url: String,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeRedisServer {
    pub async fn start(data: FakeRedisData) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("無法綁定測試端口");
        let addr = listener.local_addr().expect("無法讀取測試端口");
        let accepted = Arc::new(AtomicUsize::new(0));
        let data = Arc::new(data);

        let counter = accepted.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let ping_fails = index < data.failing_ping_connections;
                tokio::spawn(serve_connection(stream, data.clone(), ping_fails));
            }
        });

        Self {
            url: format!("redis://{}", addr),
            accepted,
            task,
        }
    }

    /// 目前為止接受過的連接數
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// 指向本服務的連接池配置，回收任務預設關閉
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            url: self.url.clone(),
            max_total: 3,
            max_idle: 3,
            wait_timeout_ms: 1_000,
            connection_timeout_secs: 1,
            eviction_interval_ms: 0,
            ..RedisConfig::default()
        }
    }
}

impl Drop for FakeRedisServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(mut stream: TcpStream, data: Arc<FakeRedisData>, ping_fails: bool) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        buffer.extend_from_slice(&chunk[..read]);

        // 管線中的多個命令按順序逐一回覆
        let mut replies = Vec::new();
        while let Some((args, consumed)) = parse_command(&buffer) {
            buffer.drain(..consumed);
            replies.extend(reply_to(&args, &data, ping_fails));
        }
        if !replies.is_empty() && stream.write_all(&replies).await.is_err() {
            return;
        }
    }
}

fn reply_to(args: &[Vec<u8>], data: &FakeRedisData, ping_fails: bool) -> Vec<u8> {
    let name = args
        .first()
        .map(|name| name.to_ascii_uppercase())
        .unwrap_or_default();

    match name.as_slice() {
        b"PING" if ping_fails => b"-ERR stale connection\r\n".to_vec(),
        b"PING" => match args.get(1) {
            Some(message) => bulk(message),
            None => b"+PONG\r\n".to_vec(),
        },
        b"SCAN" => {
            let mut out = b"*2\r\n".to_vec();
            out.extend(bulk(b"0"));
            let keys: Vec<&[u8]> = data.keys.iter().map(Vec::as_slice).collect();
            out.extend(array(&keys));
            out
        }
        b"HGETALL" => {
            let flattened: Vec<&[u8]> = data
                .hash_entries
                .iter()
                .flat_map(|(field, value)| [field.as_slice(), value.as_slice()])
                .collect();
            array(&flattened)
        }
        _ => b"+OK\r\n".to_vec(),
    }
}

fn bulk(bytes: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", bytes.len()).into_bytes();
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
    out
}

fn array(items: &[&[u8]]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        out.extend(bulk(item));
    }
    out
}

/// 解析一個完整的 `*N $len ...` 命令，返回參數與消耗的位元組數
fn parse_command(buffer: &[u8]) -> Option<(Vec<Vec<u8>>, usize)> {
    let (count, mut pos) = read_header(buffer, 0, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, start) = read_header(buffer, pos, b'$')?;
        let end = start + len;
        if buffer.len() < end + 2 {
            return None;
        }
        args.push(buffer[start..end].to_vec());
        pos = end + 2;
    }
    Some((args, pos))
}

fn read_header(buffer: &[u8], pos: usize, marker: u8) -> Option<(usize, usize)> {
    if *buffer.get(pos)? != marker {
        return None;
    }
    let line_end = buffer[pos..].windows(2).position(|w| w == b"\r\n")? + pos;
    let value = std::str::from_utf8(&buffer[pos + 1..line_end]).ok()?.parse().ok()?;
    Some((value, line_end + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_test_url_with_env_var() {
        std::env::set_var("REDIS_TEST_URL", "redis://custom:1234");

        let url = RedisTestConfig::get_test_url();
        assert_eq!(url, "redis://custom:1234");

        std::env::remove_var("REDIS_TEST_URL");
    }

    #[test]
    fn test_create_test_config() {
        let config = RedisTestConfig::create_test_config();
        assert!(config.url.starts_with("redis://"));
        assert_eq!(config.max_total, 3);
        assert_eq!(config.connection_timeout_secs, 2);
    }

    #[test]
    fn test_parse_command_waits_for_complete_frame() {
        let frame = b"*2\r\n$4\r\nPING\r\n$1\r\n7\r\n";
        assert_eq!(parse_command(&frame[..frame.len() - 3]), None);

        let (args, consumed) = parse_command(frame).expect("完整命令應可解析");
        assert_eq!(args, vec![b"PING".to_vec(), b"7".to_vec()]);
        assert_eq!(consumed, frame.len());
    }

    #[test]
    fn test_cache_config_isolates_tests() {
        let a = RedisTestConfig::cache_config("a");
        let b = RedisTestConfig::cache_config("b");
        assert_ne!(a.key_prefix, b.key_prefix);
    }
}
