use metrics::{counter, histogram};
use std::time::Duration;

/// 監控指標命名空間
pub const METRIC_NAMESPACE: &str = "cache_facade";

/// 操作結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    Ok,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::Ok => "ok",
            Outcome::Error => "error",
        }
    }
}

/// 快取外觀監控指標記錄器
///
/// 未安裝 recorder 時所有調用都是空操作。
pub struct FacadeMetrics;

impl FacadeMetrics {
    /// 記錄一次操作
    ///
    /// # Arguments
    /// * `operation` - 操作名稱 (如 "get", "hash_set")
    /// * `outcome` - 操作結果
    /// * `duration` - 包含借用連接在內的耗時
    pub fn record(operation: &'static str, outcome: Outcome, duration: Duration) {
        counter!(
            format!("{}.ops", METRIC_NAMESPACE),
            "operation" => operation,
            "outcome" => outcome.as_str()
        )
        .increment(1);

        histogram!(
            format!("{}.latency_ns", METRIC_NAMESPACE),
            "operation" => operation
        )
        .record(duration.as_nanos() as f64);
    }
}
