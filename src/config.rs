/// 配置管理模組
///
/// 本模組負責加載、驗證和管理快取外觀的配置。
/// 支持開發與生產兩種環境，未提供配置文件時全部使用內建預設值。
// 宣告子模組
pub mod loader;
pub mod manager;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigLoader, Environment};
pub use manager::{get_config, init_config};
pub use types::*;
pub use validation::{ValidationError, ValidationUtils, Validator};
