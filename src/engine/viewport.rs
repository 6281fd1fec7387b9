// ==========================================
// 生产排程甘特图 - 视口引擎
// ==========================================
// 职责: 时间 ↔ 像素投影、刻度密度、日期分段、自动适配、锚点缩放
// 红线: 纯函数，不持有也不修改视图状态（视图状态由外部 store 唯一持有）
// 不变量: 输出的 pixels_per_hour ∈ [min_px_per_hour, max_px_per_hour]
// ==========================================

use crate::config::ViewportConfig;
use crate::domain::{Operation, Timestamp, ViewState, ZoomLimits};
use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// 单次生成的刻度数上限（防止极端窗口下的失控循环）
const MAX_TICKS: usize = 20_000;

/// 自动适配的最短窗口（小时）
const MIN_FIT_HOURS: f64 = 0.1;

/// 自动适配的动态留白比例
const DYNAMIC_PADDING_RATIO: f64 = 0.05;

/// 刻度密度表: (缩放下限 px/h, 次刻度分钟, 标签刻度分钟)，按缩放从大到小
const TICK_TABLE: [(f64, i64, i64); 5] = [
    (480.0, 5, 15),
    (240.0, 10, 30),
    (120.0, 15, 60),
    (60.0, 30, 120),
    (30.0, 60, 360),
];

/// 低于表中最小缩放时使用的按天刻度
const DAILY_TICKS: (i64, i64) = (360, 1440);

// ==========================================
// 投影
// ==========================================

/// 时间 → 像素（相对窗口起点）
pub fn time_to_pixel(t: Timestamp, window_start: Timestamp, pixels_per_hour: f64) -> f64 {
    (t - window_start).num_milliseconds() as f64 / MS_PER_HOUR * pixels_per_hour
}

/// 像素 → 时间（time_to_pixel 的逆，毫秒精度）
pub fn pixel_to_time(x: f64, window_start: Timestamp, pixels_per_hour: f64) -> Timestamp {
    if pixels_per_hour <= 0.0 || !x.is_finite() {
        return window_start;
    }
    let ms = (x / pixels_per_hour * MS_PER_HOUR).round() as i64;
    window_start + Duration::milliseconds(ms)
}

// ==========================================
// 刻度
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickConfig {
    pub minor_interval_minutes: i64,
    pub label_interval_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickKind {
    Minor,
    Label,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub x: f64,
    pub time: Timestamp,
    pub kind: TickKind,
}

/// 日期轴分段（每个自然日一段，首尾按窗口截断）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySegment {
    pub x: f64,
    pub width: f64,
    pub day_start: Timestamp,
}

/// 按缩放查表，再把标签间隔放大到最小整数倍，使相邻标签间距 >= min_label_spacing_px
pub fn tick_config(pixels_per_hour: f64, min_label_spacing_px: f64) -> TickConfig {
    let (minor, mut label) = TICK_TABLE
        .iter()
        .find(|(threshold, _, _)| pixels_per_hour >= *threshold)
        .map(|&(_, minor, label)| (minor, label))
        .unwrap_or(DAILY_TICKS);

    let label_px = label as f64 / 60.0 * pixels_per_hour;
    if label_px > 0.0 && label_px < min_label_spacing_px {
        let multiplier = (min_label_spacing_px / label_px).ceil() as i64;
        label *= multiplier.max(1);
    }

    TickConfig {
        minor_interval_minutes: minor,
        label_interval_minutes: label,
    }
}

fn start_of_hour(t: Timestamp) -> Timestamp {
    t.date()
        .and_hms_opt(t.hour(), 0, 0)
        .unwrap_or_else(|| t.date().and_time(NaiveTime::MIN))
}

fn start_of_day(t: Timestamp) -> Timestamp {
    t.date().and_time(NaiveTime::MIN)
}

// ==========================================
// 自动适配 / 锚点缩放
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FittedWindow {
    pub start: Timestamp,
    pub end: Timestamp,
    pub pixels_per_hour: f64,
}

/// 缩放锚点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomAnchor {
    /// 当前水平滚动偏移
    pub scroll_left_px: f64,
    /// 光标在可视区域内的横坐标
    pub cursor_x_px: f64,
}

impl ZoomAnchor {
    /// 光标处内容坐标（相对时间轴起点）
    pub fn content_x(&self) -> f64 {
        self.scroll_left_px + self.cursor_x_px.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomOutcome {
    pub pixels_per_hour: f64,
    pub scroll_left_px: f64,
}

// ==========================================
// ViewportEngine - 视口引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ViewportEngine {
    config: ViewportConfig,
}

impl ViewportEngine {
    pub fn new(config: ViewportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn limits(&self) -> ZoomLimits {
        self.config.zoom_limits()
    }

    pub fn tick_config(&self, pixels_per_hour: f64) -> TickConfig {
        tick_config(pixels_per_hour, self.config.min_label_spacing_px)
    }

    /// 生成刻度: 从窗口起点所在整点开始，按次刻度步进到窗口终点所在整点
    pub fn generate_ticks(&self, view: &ViewState) -> Vec<Tick> {
        let cfg = self.tick_config(view.pixels_per_hour);
        let step = Duration::minutes(cfg.minor_interval_minutes.max(1));
        let first = start_of_hour(view.start_time);
        let last = start_of_hour(view.end_time);

        let mut ticks = Vec::new();
        let mut t = first;
        while t <= last {
            if ticks.len() >= MAX_TICKS {
                tracing::warn!(
                    window_hours = view.window_hours(),
                    pixels_per_hour = view.pixels_per_hour,
                    "刻度数量超过上限，已截断"
                );
                break;
            }
            let minutes = (t - first).num_minutes();
            let kind = if minutes % cfg.label_interval_minutes == 0 {
                TickKind::Label
            } else {
                TickKind::Minor
            };
            ticks.push(Tick {
                x: time_to_pixel(t, view.start_time, view.pixels_per_hour),
                time: t,
                kind,
            });
            t += step;
        }
        ticks
    }

    /// 日期轴分段
    pub fn day_segments(&self, view: &ViewState) -> Vec<DaySegment> {
        let mut segments = Vec::new();
        let mut day = start_of_day(view.start_time);
        while day < view.end_time {
            let next = day + Duration::days(1);
            let visible_from = day.max(view.start_time);
            let visible_to = next.min(view.end_time);
            segments.push(DaySegment {
                x: time_to_pixel(day, view.start_time, view.pixels_per_hour),
                width: time_to_pixel(visible_to, visible_from, view.pixels_per_hour),
                day_start: day,
            });
            day = next;
        }
        segments
    }

    /// 自动适配到一组工序
    ///
    /// 两端留白取 max(配置最小留白, 跨度的 5%)；缩放 = 可用宽度 / 窗口小时数，再钳制。
    /// 工序集合为空时返回 None（调用方保持原视图）。
    pub fn auto_fit(&self, operations: &[&Operation], available_width_px: f64) -> Option<FittedWindow> {
        let min_start = operations.iter().map(|op| op.start_time).min()?;
        let max_end = operations.iter().map(|op| op.end_time).max()?;

        let span_minutes = (max_end - min_start).num_milliseconds().max(0) as f64 / 60_000.0;
        let padding_minutes = self
            .config
            .auto_fit_padding_minutes
            .max(span_minutes * DYNAMIC_PADDING_RATIO);
        let padding = Duration::milliseconds((padding_minutes * 60_000.0).round() as i64);

        let start = min_start - padding;
        let end = max_end + padding;
        let hours = ((end - start).num_milliseconds() as f64 / MS_PER_HOUR).max(MIN_FIT_HOURS);
        let pixels_per_hour = self.limits().clamp(available_width_px / hours);

        Some(FittedWindow {
            start,
            end,
            pixels_per_hour,
        })
    }

    /// 以光标为锚点缩放
    ///
    /// 光标下的时间点在缩放前后保持同一屏幕位置: 新滚动偏移由新旧缩放比例推出，
    /// 并钳制到 [0, 总宽度 - 可视宽度]。缩放系数被钳制后不变时原样返回。
    pub fn zoom_at(
        &self,
        anchor: ZoomAnchor,
        current_px_per_hour: f64,
        factor: f64,
        window_hours: f64,
        viewport_width_px: f64,
    ) -> ZoomOutcome {
        let limits = self.limits();
        let current = limits.clamp(current_px_per_hour);
        let next = if factor.is_finite() && factor > 0.0 {
            limits.clamp(current * factor)
        } else {
            current
        };
        if next == current {
            return ZoomOutcome {
                pixels_per_hour: current,
                scroll_left_px: anchor.scroll_left_px,
            };
        }

        let cursor_x = anchor.cursor_x_px.max(0.0);
        let new_content_x = anchor.content_x() * (next / current);
        let max_scroll = (window_hours.max(0.0) * next - viewport_width_px).max(0.0);
        let scroll_left_px = (new_content_x - cursor_x).clamp(0.0, max_scroll);

        ZoomOutcome {
            pixels_per_hour: next,
            scroll_left_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn view(start: Timestamp, end: Timestamp, pph: f64) -> ViewState {
        ViewState::new(start, end, pph, &ZoomLimits::default())
    }

    #[test]
    fn test_projection_round_trip() {
        let start = at(10, 0, 0);
        let t = at(10, 6, 30);
        let x = time_to_pixel(t, start, 60.0);
        assert_eq!(x, 390.0);
        assert_eq!(pixel_to_time(x, start, 60.0), t);
        assert!(time_to_pixel(at(9, 23, 0), start, 60.0) < 0.0);
    }

    #[test]
    fn test_tick_table_lookup() {
        assert_eq!(tick_config(480.0, 0.0).minor_interval_minutes, 5);
        assert_eq!(tick_config(480.0, 0.0).label_interval_minutes, 15);
        assert_eq!(tick_config(100.0, 0.0).minor_interval_minutes, 30);
        assert_eq!(tick_config(10.0, 0.0).label_interval_minutes, 1440);
    }

    #[test]
    fn test_label_interval_inflated_to_min_spacing() {
        // 480 px/h, 15 min → 120 px
        assert_eq!(tick_config(480.0, 60.0).label_interval_minutes, 15);
        // 30 px/h, 360 min → 180 px; 需要 400 px → ×3
        assert_eq!(tick_config(30.0, 400.0).label_interval_minutes, 1080);
        // 60 px/h, 120 min → 120 px; 需要 130 px → ×2
        let cfg = tick_config(60.0, 130.0);
        assert_eq!(cfg.label_interval_minutes, 240);
        assert!(cfg.label_interval_minutes as f64 / 60.0 * 60.0 >= 130.0);
    }

    #[test]
    fn test_generate_ticks_marks_labels() {
        let engine = ViewportEngine::default();
        let ticks = engine.generate_ticks(&view(at(10, 0, 15), at(10, 4, 0), 60.0));
        // 从 00:00 开始，每 30 分钟，至 04:00
        assert_eq!(ticks.len(), 9);
        assert_eq!(ticks[0].time, at(10, 0, 0));
        assert_eq!(ticks[0].kind, TickKind::Label);
        assert_eq!(ticks[1].kind, TickKind::Minor);
        assert_eq!(ticks[4].kind, TickKind::Label);
        assert_eq!(ticks[0].x, -15.0);
    }

    #[test]
    fn test_day_segments_are_clipped_to_window() {
        let engine = ViewportEngine::default();
        let segments = engine.day_segments(&view(at(10, 12, 0), at(12, 6, 0), 60.0));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].width, 12.0 * 60.0);
        assert_eq!(segments[1].width, 24.0 * 60.0);
        assert_eq!(segments[2].width, 6.0 * 60.0);
        assert_eq!(segments[1].x, 12.0 * 60.0);
    }

    #[test]
    fn test_auto_fit_pads_and_clamps() {
        let engine = ViewportEngine::default();
        let a = Operation::new("ZL-1", "M1", at(10, 6, 0), at(10, 8, 0));
        let b = Operation::new("ZL-1", "M2", at(10, 9, 0), at(10, 10, 0));

        let fit = engine.auto_fit(&[&a, &b], 1000.0).unwrap();
        // 跨度 4h → 5% = 12 min < 30 min
        assert_eq!(fit.start, at(10, 5, 30));
        assert_eq!(fit.end, at(10, 10, 30));
        assert_eq!(fit.pixels_per_hour, 200.0);

        let narrow = engine.auto_fit(&[&a], 10.0).unwrap();
        assert_eq!(narrow.pixels_per_hour, 30.0);
        let wide = engine.auto_fit(&[&a], 100_000.0).unwrap();
        assert_eq!(wide.pixels_per_hour, 300.0);

        assert!(engine.auto_fit(&[], 1000.0).is_none());
    }

    #[test]
    fn test_auto_fit_uses_dynamic_padding_for_long_spans() {
        let engine = ViewportEngine::default();
        let op = Operation::new("ZL-1", "M1", at(1, 0, 0), at(21, 0, 0));
        let fit = engine.auto_fit(&[&op], 1000.0).unwrap();
        // 20 天 × 5% = 24h
        assert_eq!(fit.start, at(1, 0, 0) - Duration::hours(24));
    }

    #[test]
    fn test_zoom_keeps_cursor_time_fixed() {
        let engine = ViewportEngine::default();
        let anchor = ZoomAnchor {
            scroll_left_px: 600.0,
            cursor_x_px: 200.0,
        };
        let out = engine.zoom_at(anchor, 100.0, 1.5, 48.0, 1000.0);
        assert_eq!(out.pixels_per_hour, 150.0);
        // 光标处时间: 800 / 100 = 8h → 新内容坐标 1200，滚动 1000
        assert!((out.scroll_left_px - 1000.0).abs() < 1e-9);
        let hours_before = anchor.content_x() / 100.0;
        let hours_after = (out.scroll_left_px + anchor.cursor_x_px) / out.pixels_per_hour;
        assert!((hours_before - hours_after).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped_and_noop_at_limit() {
        let engine = ViewportEngine::default();
        let anchor = ZoomAnchor {
            scroll_left_px: 50.0,
            cursor_x_px: 10.0,
        };
        let out = engine.zoom_at(anchor, 300.0, 2.0, 24.0, 800.0);
        assert_eq!(out.pixels_per_hour, 300.0);
        assert_eq!(out.scroll_left_px, 50.0);

        let out = engine.zoom_at(anchor, 40.0, 0.1, 24.0, 800.0);
        assert_eq!(out.pixels_per_hour, 30.0);
        assert!(out.scroll_left_px >= 0.0);
    }
}
