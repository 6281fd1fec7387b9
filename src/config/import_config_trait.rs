// ==========================================
// 生产排程甘特图 - 配置读取 Trait
// ==========================================
// 职责: 定义引擎各模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::engine_config::{ImportConfig, LayoutConfig, ViewportConfig};
use crate::importer::error::ImporterResult;
use async_trait::async_trait;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 用途: 导入、视口、布局模块读取配置
// 实现者: ConfigManager
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 导入配置（分块、行数上限、年份区间、语言）
    async fn get_import_config(&self) -> ImporterResult<ImportConfig>;

    /// 视口配置（缩放上下限、刻度间距、虚拟化阈值）
    async fn get_viewport_config(&self) -> ImporterResult<ViewportConfig>;

    /// 行布局配置（泳道高度与间距）
    async fn get_layout_config(&self) -> ImporterResult<LayoutConfig>;
}
