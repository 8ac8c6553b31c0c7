use anyhow::{bail, Context, Result};
use cache_facade::config::{init_config, ApplicationConfig, Environment};
use cache_facade::logging::init_logging;
use cache_facade::redis::{
    CacheManager, CacheOperations, ConnectionPool, HashOperations, KeyspaceOperations,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "cachectl", about = "Redis 快取外觀管理工具")]
struct Cli {
    /// 配置環境 (development 或 production)，預設讀取 CACHE_ENV
    #[arg(long)]
    env: Option<String>,

    /// 覆蓋配置中的 Redis URL
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 檢查伺服器連線
    Ping,

    /// 讀取鍵的值
    Get { key: String },

    /// 存儲 JSON 值
    Save {
        key: String,
        /// JSON 格式的值
        value: String,
        /// 存活時間（秒），預設使用配置中的 default_ttl_secs
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// 刪除一個或多個鍵
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// 移除鍵的過期時間
    Persist { key: String },

    /// 設置鍵的過期時間
    Expire { key: String, seconds: u64 },

    /// 查詢剩餘存活時間
    Ttl { key: String },

    /// 檢查鍵是否存在
    Exists { key: String },

    /// 列出名稱包含指定片段的鍵
    Keys { fragment: String },

    /// 設置雜湊欄位
    Hset {
        key: String,
        field: String,
        /// JSON 格式的值
        value: String,
    },

    /// 讀取雜湊欄位
    Hget { key: String, field: String },

    /// 刪除雜湊欄位
    Hdel { key: String, field: String },

    /// 讀取雜湊的所有欄位
    Hgetall { key: String },

    /// 清空伺服器上的所有鍵
    FlushAll {
        /// 確認執行，此操作無法復原
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(cli: &Cli) -> Result<ApplicationConfig> {
    let mut app_config = match &cli.env {
        Some(env) => ApplicationConfig::load(Environment::parse(env))
            .with_context(|| format!("無法加載 {} 環境配置", env))?,
        None => init_config().context("無法加載應用程序配置")?.clone(),
    };

    if let Some(url) = &cli.url {
        app_config.redis.url = url.clone();
    }
    Ok(app_config)
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("無效的 JSON 值: {}", raw))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = load_config(&cli)?;

    let _guard = init_logging(&app_config.log)?;

    let pool = Arc::new(
        ConnectionPool::new(app_config.redis.clone())
            .await
            .context("無法初始化Redis連接池")?,
    );
    info!("連接到 {}", app_config.redis.url);

    let cache = CacheManager::with_config(Arc::clone(&pool), &app_config.cache);
    let result = run(&cache, cli.command).await;

    pool.close();
    result
}

async fn run(cache: &CacheManager<Arc<ConnectionPool>>, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => println!("{}", cache.ping().await?),
        Commands::Get { key } => {
            let value: Option<Value> = cache.get(&key).await?;
            print_json(&value)?;
        }
        Commands::Save { key, value, ttl } => {
            let value = parse_json(&value)?;
            match ttl {
                Some(ttl) => cache.save_with_ttl(&key, &value, ttl).await?,
                None => cache.save(&key, &value).await?,
            }
            println!("OK");
        }
        Commands::Delete { keys } => println!("{}", cache.delete(&keys).await?),
        Commands::Persist { key } => println!("{}", cache.remove_ttl(&key).await?),
        Commands::Expire { key, seconds } => println!("{}", cache.expire(&key, seconds).await?),
        Commands::Ttl { key } => print_json(&cache.ttl(&key).await?)?,
        Commands::Exists { key } => println!("{}", cache.exists(&key).await?),
        Commands::Keys { fragment } => {
            let mut keys: Vec<String> = cache.keys_matching(&fragment).await?.into_iter().collect();
            keys.sort();
            for key in keys {
                println!("{}", key);
            }
        }
        Commands::Hset { key, field, value } => {
            let value = parse_json(&value)?;
            println!("{}", cache.hash_set(&key, &field, &value).await?);
        }
        Commands::Hget { key, field } => {
            let value: Option<Value> = cache.hash_get(&key, &field).await?;
            print_json(&value)?;
        }
        Commands::Hdel { key, field } => println!("{}", cache.hash_delete(&key, &field).await?),
        Commands::Hgetall { key } => {
            let fields: BTreeMap<String, Value> =
                cache.hash_get_all::<_, Value>(&key).await?.into_iter().collect();
            print_json(&fields)?;
        }
        Commands::FlushAll { yes } => {
            if !yes {
                bail!("flush-all 會刪除伺服器上的所有鍵，請加上 --yes 確認");
            }
            cache.flush_all().await?;
            println!("OK");
        }
    }

    Ok(())
}
