// ==========================================
// 生产排程甘特图 - 引擎配置项
// ==========================================
// 职责: 配置项全集（导入 / 视口 / 布局）及默认值、校验
// ==========================================

use crate::domain::ZoomLimits;
use crate::importer::error::{ImportError, ImporterResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// ImportConfig - 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// 每块行数（块边界: 进度、取消检查、让出执行权）
    pub chunk_size: usize,
    /// 单次导入最多处理的行数
    pub max_rows: usize,
    /// 进度回调最小间隔（毫秒）
    pub progress_throttle_ms: u64,
    /// 年份合理区间（闭区间）
    pub year_min: i32,
    pub year_max: i32,
    /// 行级诊断消息语言（"en" / "pl"）
    pub locale: String,
    /// 慢块告警阈值（毫秒）
    pub slow_chunk_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            max_rows: 50_000,
            progress_throttle_ms: 100,
            year_min: 2000,
            year_max: 2050,
            locale: "en".to_string(),
            slow_chunk_ms: 1000,
        }
    }
}

impl ImportConfig {
    pub fn progress_throttle(&self) -> Duration {
        Duration::from_millis(self.progress_throttle_ms)
    }

    pub fn slow_chunk_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_chunk_ms)
    }
}

// ==========================================
// ViewportConfig - 视口配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_px_per_hour: f64,
    pub max_px_per_hour: f64,
    pub default_px_per_hour: f64,
    /// 相邻刻度标签的最小间距
    pub min_label_spacing_px: f64,
    /// 资源行数超过该值才启用虚拟化
    pub virtualization_threshold: usize,
    pub overscan_px: f64,
    /// 自动适配时两端的最小留白（分钟）
    pub auto_fit_padding_minutes: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_px_per_hour: 30.0,
            max_px_per_hour: 300.0,
            default_px_per_hour: 60.0,
            min_label_spacing_px: 60.0,
            virtualization_threshold: 500,
            overscan_px: 600.0,
            auto_fit_padding_minutes: 30.0,
        }
    }
}

impl ViewportConfig {
    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits::new(self.min_px_per_hour, self.max_px_per_hour)
    }
}

// ==========================================
// LayoutConfig - 行布局配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub lane_height: f64,
    pub lane_gap: f64,
    pub row_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_height: 24.0,
            lane_gap: 4.0,
            row_gap: 16.0,
        }
    }
}

// ==========================================
// EngineConfig - 配置全集
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub import: ImportConfig,
    pub viewport: ViewportConfig,
    pub layout: LayoutConfig,
}

fn invalid(key: &str, value: impl ToString, message: &str) -> ImportError {
    ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

impl EngineConfig {
    /// 校验配置一致性
    pub fn validate(&self) -> ImporterResult<()> {
        let import = &self.import;
        if import.chunk_size == 0 {
            return Err(invalid("import.chunk_size", import.chunk_size, "must be > 0"));
        }
        if import.max_rows == 0 {
            return Err(invalid("import.max_rows", import.max_rows, "must be > 0"));
        }
        if import.year_min > import.year_max {
            return Err(invalid(
                "import.year_min",
                import.year_min,
                "must not exceed import.year_max",
            ));
        }
        if import.locale.trim().is_empty() {
            return Err(invalid("import.locale", "", "must not be empty"));
        }

        let viewport = &self.viewport;
        if viewport.min_px_per_hour.is_nan() || viewport.min_px_per_hour <= 0.0 {
            return Err(invalid(
                "viewport.min_px_per_hour",
                viewport.min_px_per_hour,
                "must be > 0",
            ));
        }
        if viewport.min_px_per_hour > viewport.max_px_per_hour {
            return Err(invalid(
                "viewport.min_px_per_hour",
                viewport.min_px_per_hour,
                "must not exceed viewport.max_px_per_hour",
            ));
        }
        if !viewport.zoom_limits().contains(viewport.default_px_per_hour) {
            return Err(invalid(
                "viewport.default_px_per_hour",
                viewport.default_px_per_hour,
                "must lie within the zoom limits",
            ));
        }
        if viewport.overscan_px < 0.0 {
            return Err(invalid("viewport.overscan_px", viewport.overscan_px, "must be >= 0"));
        }

        let layout = &self.layout;
        if layout.lane_height.is_nan() || layout.lane_height <= 0.0 {
            return Err(invalid("layout.lane_height", layout.lane_height, "must be > 0"));
        }
        if layout.lane_gap < 0.0 || layout.row_gap < 0.0 {
            return Err(invalid("layout.lane_gap", layout.lane_gap, "gaps must be >= 0"));
        }
        Ok(())
    }
}
