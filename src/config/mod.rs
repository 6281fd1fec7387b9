// ==========================================
// 生产排程甘特图 - 配置层
// ==========================================
// 职责: 引擎配置管理，支持文件 + 环境变量多级覆写
// ==========================================

pub mod config_manager;
pub mod engine_config;
pub mod import_config_trait;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config::{EngineConfig, ImportConfig, LayoutConfig, ViewportConfig};
pub use import_config_trait::EngineConfigReader;
