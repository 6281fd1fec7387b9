// ==========================================
// 生产排程甘特图 - 核心库
// ==========================================
// 职责: 排程文件导入（CSV / 表格）+ 甘特图泳道与视口计算
// 系统定位: 纯计算核心，持久化与渲染由宿主负责
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与值类型
pub mod domain;

// 导入层 - 文件解析、字段映射、行处理
pub mod importer;

// 引擎层 - 泳道、视口、布局、状态
pub mod engine;

// 配置层 - 引擎配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    FieldMapping, ImportProgress, ImportResult, ImportStage, LogicalField, MappingProfile,
    Operation, OperationStatus, Timestamp, Transformation, ViewFilters, ViewState, ZoomLimits,
};

// 导入
pub use importer::{
    CancellationSource, CancellationToken, DateNormalizer, FieldMapper, ImportError,
    ImportOptions, ImportProcessor, ImporterResult, UniversalFileParser,
};

// 引擎
pub use engine::{
    DrawListBuilder, ImportEventBus, LayoutEngine, StatusWorker, ViewportEngine,
};

// 配置
pub use config::{ConfigManager, EngineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "生产排程甘特图";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
