// ==========================================
// 生产排程甘特图 - 视图状态模型
// ==========================================
// 职责: 时间窗口 + 缩放系数 + 过滤条件
// 不变量: end_time >= start_time;
//         pixels_per_hour ∈ [min_px_per_hour, max_px_per_hour]
// 说明: 视图状态由外部 store 持有，引擎函数只读
// ==========================================

use crate::domain::operation::{Operation, Timestamp};
use serde::{Deserialize, Serialize};

// ==========================================
// ZoomLimits - 缩放上下限
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min_px_per_hour: f64,
    pub max_px_per_hour: f64,
}

impl ZoomLimits {
    pub const DEFAULT_MIN_PX_PER_HOUR: f64 = 30.0;
    pub const DEFAULT_MAX_PX_PER_HOUR: f64 = 300.0;

    pub fn new(min_px_per_hour: f64, max_px_per_hour: f64) -> Self {
        Self {
            min_px_per_hour,
            max_px_per_hour,
        }
    }

    /// 将缩放系数钳制到合法范围（NaN 视为下限）
    pub fn clamp(&self, px_per_hour: f64) -> f64 {
        if px_per_hour.is_nan() {
            return self.min_px_per_hour;
        }
        px_per_hour.clamp(self.min_px_per_hour, self.max_px_per_hour)
    }

    pub fn contains(&self, px_per_hour: f64) -> bool {
        px_per_hour >= self.min_px_per_hour && px_per_hour <= self.max_px_per_hour
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_PX_PER_HOUR, Self::DEFAULT_MAX_PX_PER_HOUR)
    }
}

// ==========================================
// ViewFilters - 过滤条件（在泳道打包之前应用）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewFilters {
    pub selected_order_ids: Vec<String>,
    pub resource_filters: Vec<String>,
    pub part_no_filters: Vec<String>,
    pub op_no_filters: Vec<String>,
    /// 资源行的首选顺序（未列出的资源排在最后，按名称）
    pub resource_order: Vec<String>,
}

impl ViewFilters {
    /// 工序是否通过全部过滤条件（空列表表示不过滤）
    pub fn accepts(&self, op: &Operation) -> bool {
        if !self.selected_order_ids.is_empty() && !self.selected_order_ids.contains(&op.order_no) {
            return false;
        }
        if !self.resource_filters.is_empty() && !self.resource_filters.contains(&op.resource) {
            return false;
        }
        if !self.part_no_filters.is_empty() {
            match &op.part_no {
                Some(part) if self.part_no_filters.contains(part) => {}
                _ => return false,
            }
        }
        if !self.op_no_filters.is_empty() {
            match &op.op_no {
                Some(op_no) if self.op_no_filters.contains(op_no) => {}
                _ => return false,
            }
        }
        true
    }
}

// ==========================================
// ViewState - 视图状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub pixels_per_hour: f64,
    #[serde(default)]
    pub filters: ViewFilters,
}

impl ViewState {
    /// 创建视图状态（窗口颠倒时交换，缩放系数钳制）
    pub fn new(start: Timestamp, end: Timestamp, pixels_per_hour: f64, limits: &ZoomLimits) -> Self {
        let (start_time, end_time) = if end < start { (end, start) } else { (start, end) };
        Self {
            start_time,
            end_time,
            pixels_per_hour: limits.clamp(pixels_per_hour),
            filters: ViewFilters::default(),
        }
    }

    pub fn set_window(&mut self, start: Timestamp, end: Timestamp) {
        if end < start {
            self.start_time = end;
            self.end_time = start;
        } else {
            self.start_time = start;
            self.end_time = end;
        }
    }

    pub fn set_zoom(&mut self, pixels_per_hour: f64, limits: &ZoomLimits) {
        self.pixels_per_hour = limits.clamp(pixels_per_hour);
    }

    /// 窗口时长（小时）
    pub fn window_hours(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 3_600_000.0
    }

    /// 时间轴总宽度（像素）
    pub fn total_width_px(&self) -> f64 {
        self.window_hours() * self.pixels_per_hour
    }
}
