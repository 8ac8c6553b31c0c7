//! 日誌系統初始化
//!
//! 依 [`LogConfig`] 安裝 tracing 訂閱者。`RUST_LOG` 存在時優先於配置中的級別。

use crate::config::{LogConfig, LogFormat};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// 日誌初始化錯誤
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("無效的日誌級別: {0}")]
    InvalidLevel(String),

    #[error("無法建立日誌目錄: {0}")]
    Io(#[from] std::io::Error),

    #[error("設置日誌系統失敗: {0}")]
    Init(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 建立日誌過濾器
fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel(e.to_string())),
    }
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
    }
}

/// 初始化日誌系統
///
/// 配置了日誌文件時返回的 guard 必須持有到程序結束，否則緩衝中的日誌會遺失。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    layers.push(
        format_layer(config.format, std::io::stderr, true)
            .with_filter(build_filter(&config.level)?)
            .boxed(),
    );

    if let Some(file) = &config.file {
        let path = Path::new(file);
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("cache_facade.log");
        let appender = tracing_appender::rolling::daily(directory, file_name);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        layers.push(
            format_layer(config.format, non_blocking, false)
                .with_filter(build_filter(&config.level)?)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    info!("日誌系統初始化完成");
    Ok(guard)
}
