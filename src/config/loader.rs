use config::{Config, ConfigError, Environment as ConfigEnvironment, File};
use std::env;
use std::path::{Path, PathBuf};

/// 選擇環境的環境變數
pub const ENV_VAR: &str = "CACHE_ENV";

/// 配置目錄的環境變數
pub const CONFIG_DIR_VAR: &str = "CACHE_CONFIG_DIR";

/// 環境變數覆蓋的前綴，例如 `CACHE__REDIS__URL`
pub const ENV_PREFIX: &str = "CACHE";

/// 環境類型枚舉
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// 從環境變數取得當前環境設定
    pub fn from_env() -> Self {
        env::var(ENV_VAR)
            .map(|value| Self::parse(&value))
            .unwrap_or(Environment::Development)
    }

    /// 解析環境名稱，未知名稱視為開發環境
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// 轉換為配置文件名
    pub fn as_filename(&self) -> &'static str {
        match self {
            Environment::Development => "development.toml",
            Environment::Production => "production.toml",
        }
    }
}

/// 配置加載器，負責根據環境加載適當的配置
pub struct ConfigLoader;

impl ConfigLoader {
    /// 取得配置目錄
    pub fn config_dir() -> PathBuf {
        PathBuf::from(env::var(CONFIG_DIR_VAR).unwrap_or_else(|_| "config".into()))
    }

    /// 載入指定環境的配置
    pub fn load(env: Environment) -> Result<Config, ConfigError> {
        Self::load_from_dir(&Self::config_dir(), env)
    }

    /// 從指定目錄載入配置
    ///
    /// 配置文件可以不存在，此時只使用預設值與環境變數。
    pub fn load_from_dir(dir: &Path, env: Environment) -> Result<Config, ConfigError> {
        let config_path = dir.join(env.as_filename());

        Config::builder()
            // 加載環境特定配置
            .add_source(File::from(config_path).required(false))
            // 從環境變數加載配置（優先級高於文件配置）
            .add_source(
                ConfigEnvironment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
    }
}
