use crate::config::loader::{ConfigLoader, Environment};
use crate::config::types::ApplicationConfig;
use crate::config::validation::Validator;
use config::ConfigError;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

// 全局配置實例
static CONFIG: OnceCell<ApplicationConfig> = OnceCell::new();

/// 獲取已初始化的應用程序配置
pub fn get_config() -> Option<&'static ApplicationConfig> {
    CONFIG.get()
}

/// 初始化配置（在應用程序啟動時調用）
///
/// 重複調用時返回第一次載入的配置。
pub fn init_config() -> Result<&'static ApplicationConfig, ConfigError> {
    CONFIG.get_or_try_init(|| {
        let app_config = ApplicationConfig::load_from_env()?;
        debug!("配置初始化成功，環境：{:?}", Environment::from_env());
        Ok(app_config)
    })
}

/// ApplicationConfig 加載方法實現
impl ApplicationConfig {
    /// 從環境變數指定的環境加載配置
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let env = Environment::from_env();
        debug!("從環境加載配置: {:?}", env);
        Self::load(env)
    }

    /// 從指定環境加載配置
    pub fn load(env: Environment) -> Result<Self, ConfigError> {
        let config_source = ConfigLoader::load(env)?;
        Self::from_source(config_source)
    }

    /// 反序列化並驗證配置
    pub fn from_source(source: config::Config) -> Result<Self, ConfigError> {
        let app_config: ApplicationConfig = source.try_deserialize()?;

        if let Err(err) = app_config.validate() {
            warn!("配置驗證失敗: {}", err);
            return Err(ConfigError::Message(err.to_string()));
        }
        debug!("配置驗證通過");

        Ok(app_config)
    }
}
