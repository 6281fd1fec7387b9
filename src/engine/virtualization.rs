// ==========================================
// 生产排程甘特图 - 虚拟化与绘制列表
// ==========================================
// 职责: 只保留与可视区域（含预渲染边距）相交的行与工序条
// 说明: 行数不超过阈值时不做纵向虚拟化，直接返回全部行
// ==========================================

use crate::config::{LayoutConfig, ViewportConfig};
use crate::domain::{Operation, OperationStatus, ViewState};
use crate::engine::layout::{GanttLayout, GanttRow, LayoutEngine};
use crate::engine::viewport::{time_to_pixel, DaySegment, Tick, ViewportEngine};
use serde::Serialize;
use std::collections::HashMap;

/// 滚动视口（像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollWindow {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

/// 纵向可见行
///
/// 行按 top 递增且互不重叠，因此用二分定位首尾。
/// 相交条件: row.bottom >= scroll_top - overscan 且 row.top <= scroll_top + 高度 + overscan。
pub fn visible_rows<'r, 'a>(
    rows: &'r [GanttRow<'a>],
    scroll_top: f64,
    viewport_height: f64,
    overscan_px: f64,
    threshold: usize,
) -> &'r [GanttRow<'a>] {
    if rows.len() <= threshold {
        return rows;
    }
    let window_top = (scroll_top - overscan_px).max(0.0);
    let window_bottom = scroll_top + viewport_height + overscan_px;

    let first = rows.partition_point(|row| row.bottom() < window_top);
    let last = rows.partition_point(|row| row.top <= window_bottom);
    if first >= last {
        return &[];
    }
    &rows[first..last]
}

/// 单个工序条
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarDraw {
    pub operation_id: String,
    pub order_no: String,
    pub lane: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub status: Option<OperationStatus>,
}

/// 单个资源行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDraw {
    pub resource: String,
    pub top: f64,
    pub height: f64,
    pub lane_count: usize,
    pub bars: Vec<BarDraw>,
}

/// 绘制列表
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawList {
    pub rows: Vec<RowDraw>,
    pub ticks: Vec<Tick>,
    pub day_segments: Vec<DaySegment>,
    pub total_width: f64,
    pub total_height: f64,
    /// 虚拟化前的行数
    pub total_rows: usize,
}

impl DrawList {
    pub fn bar_count(&self) -> usize {
        self.rows.iter().map(|r| r.bars.len()).sum()
    }
}

// ==========================================
// DrawListBuilder - 绘制列表构建器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DrawListBuilder {
    viewport: ViewportEngine,
    layout: LayoutEngine,
}

impl DrawListBuilder {
    pub fn new(viewport: ViewportConfig, layout: LayoutConfig) -> Self {
        Self {
            viewport: ViewportEngine::new(viewport),
            layout: LayoutEngine::new(layout),
        }
    }

    pub fn viewport(&self) -> &ViewportEngine {
        &self.viewport
    }

    /// 生成绘制列表
    ///
    /// 横向: 工序条的 [x, x + width] 与 [scroll_left - overscan, scroll_left + 宽度 + overscan] 相交才保留。
    /// statuses 为空时工序条不带状态。
    pub fn build(
        &self,
        layout: &GanttLayout<'_>,
        view: &ViewState,
        scroll: &ScrollWindow,
        statuses: &HashMap<String, OperationStatus>,
    ) -> DrawList {
        let config = self.viewport.config();
        let overscan = config.overscan_px;
        let rows = visible_rows(
            &layout.rows,
            scroll.scroll_top,
            scroll.viewport_height,
            overscan,
            config.virtualization_threshold,
        );

        let left = scroll.scroll_left - overscan;
        let right = scroll.scroll_left + scroll.viewport_width + overscan;
        let bar_height = self.layout.lane_height();

        let rows = rows
            .iter()
            .map(|row| {
                let mut bars = Vec::new();
                for (lane, ops) in row.lanes.iter().enumerate() {
                    let y = row.top + self.layout.lane_offset(lane);
                    bars.extend(ops.iter().filter_map(|op| {
                        let (x, width) = bar_extent(op, view);
                        (x + width >= left && x <= right).then(|| BarDraw {
                            operation_id: op.id.clone(),
                            order_no: op.order_no.clone(),
                            lane,
                            x,
                            y,
                            width,
                            height: bar_height,
                            status: statuses.get(&op.id).copied(),
                        })
                    }));
                }
                RowDraw {
                    resource: row.resource.clone(),
                    top: row.top,
                    height: row.height,
                    lane_count: row.lane_count(),
                    bars,
                }
            })
            .collect();

        DrawList {
            rows,
            ticks: self.viewport.generate_ticks(view),
            day_segments: self.viewport.day_segments(view),
            total_width: view.total_width_px(),
            total_height: layout.total_height,
            total_rows: layout.rows.len(),
        }
    }
}

fn bar_extent(op: &Operation, view: &ViewState) -> (f64, f64) {
    let x = time_to_pixel(op.start_time, view.start_time, view.pixels_per_hour);
    let end = time_to_pixel(op.end_time, view.start_time, view.pixels_per_hour);
    (x, (end - x).max(0.0))
}
