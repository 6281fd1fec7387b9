// ==========================================
// 生产排程甘特图 - 行布局引擎
// ==========================================
// 职责: 工序集合 + 过滤条件 → 资源行（泳道、行高、纵向位置）+ 工艺路线连线
// 流程:
//   1. 过滤（订单 / 资源 / 零件号 / 工序号）
//   2. 按 顺序号(或工序号数值) → 开始时间 排序
//   3. 按资源分组（首次出现顺序）→ 泳道打包
//   4. 行高 = 泳道数 × 泳道高 + (泳道数 - 1) × 泳道间距，至少一条泳道高
//   5. 可选首选资源顺序（未列出者按名称排在最后）→ 重新计算纵向位置
// ==========================================

use crate::config::LayoutConfig;
use crate::domain::{Operation, ViewFilters};
use crate::engine::lane_packer;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::instrument;

/// 资源行
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttRow<'a> {
    pub resource: String,
    pub top: f64,
    pub height: f64,
    pub lanes: Vec<Vec<&'a Operation>>,
}

impl GanttRow<'_> {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}

/// 工艺路线连线（同一订单相邻两道工序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConnection {
    pub order_no: String,
    pub from_id: String,
    pub to_id: String,
}

/// 布局结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttLayout<'a> {
    pub rows: Vec<GanttRow<'a>>,
    pub total_height: f64,
}

impl<'a> GanttLayout<'a> {
    pub fn row(&self, resource: &str) -> Option<&GanttRow<'a>> {
        self.rows.iter().find(|r| r.resource == resource)
    }
}

/// 排序键: 顺序号优先，缺失时取工序号的前导数字，均缺失为 0
fn route_rank(op: &Operation) -> i64 {
    op.sequence
        .or_else(|| op.op_no.as_deref().and_then(leading_integer))
        .unwrap_or(0)
}

fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let sign_len = usize::from(trimmed.starts_with('-'));
    let digits = trimmed[sign_len..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    trimmed[..sign_len + digits].parse().ok()
}

fn route_order(a: &Operation, b: &Operation) -> Ordering {
    route_rank(a)
        .cmp(&route_rank(b))
        .then_with(|| a.start_time.cmp(&b.start_time))
}

// ==========================================
// LayoutEngine - 行布局引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// 行高（泳道数为 0 时按一条泳道）
    pub fn row_height(&self, lane_count: usize) -> f64 {
        let lanes = lane_count.max(1) as f64;
        lanes * self.config.lane_height + (lanes - 1.0) * self.config.lane_gap
    }

    /// 泳道在行内的纵向偏移
    pub fn lane_offset(&self, lane_index: usize) -> f64 {
        lane_index as f64 * (self.config.lane_height + self.config.lane_gap)
    }

    pub fn lane_height(&self) -> f64 {
        self.config.lane_height
    }

    /// 构建资源行
    #[instrument(skip(self, operations, filters), fields(count = operations.len()))]
    pub fn build<'a>(&self, operations: &'a [Operation], filters: &ViewFilters) -> GanttLayout<'a> {
        let mut filtered: Vec<&'a Operation> =
            operations.iter().filter(|op| filters.accepts(op)).collect();
        filtered.sort_by(|a, b| route_order(a, b));

        // 按资源分组，保持首次出现顺序
        let mut groups: Vec<(String, Vec<&'a Operation>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for op in filtered {
            match index.get(op.resource.as_str()) {
                Some(&i) => groups[i].1.push(op),
                None => {
                    index.insert(op.resource.as_str(), groups.len());
                    groups.push((op.resource.clone(), vec![op]));
                }
            }
        }

        let mut rows: Vec<GanttRow<'a>> = groups
            .into_iter()
            .map(|(resource, ops)| {
                let lanes: Vec<Vec<&'a Operation>> = lane_packer::pack(&ops)
                    .into_iter()
                    .map(|lane| lane.into_iter().copied().collect())
                    .collect();
                GanttRow {
                    resource,
                    top: 0.0,
                    height: self.row_height(lanes.len()),
                    lanes,
                }
            })
            .collect();

        if !filters.resource_order.is_empty() {
            let preferred: HashMap<&str, usize> = filters
                .resource_order
                .iter()
                .enumerate()
                .map(|(i, r)| (r.as_str(), i))
                .collect();
            // 稳定排序: 同优先级按名称
            rows.sort_by(|a, b| {
                let ai = preferred.get(a.resource.as_str()).copied().unwrap_or(usize::MAX);
                let bi = preferred.get(b.resource.as_str()).copied().unwrap_or(usize::MAX);
                ai.cmp(&bi).then_with(|| a.resource.cmp(&b.resource))
            });
        }

        let mut top = 0.0;
        for row in &mut rows {
            row.top = top;
            top += row.height + self.config.row_gap;
        }
        let total_height = rows
            .last()
            .map(|last| last.bottom() + self.config.row_gap)
            .unwrap_or(0.0);

        tracing::debug!(rows = rows.len(), total_height, "行布局完成");
        GanttLayout { rows, total_height }
    }

    /// 选中订单的工艺路线连线
    pub fn route_connections(
        &self,
        operations: &[Operation],
        selected_orders: &[String],
    ) -> Vec<RouteConnection> {
        let mut connections = Vec::new();
        for order_no in selected_orders {
            let mut route: Vec<&Operation> = operations
                .iter()
                .filter(|op| &op.order_no == order_no)
                .collect();
            route.sort_by(|a, b| {
                a.sequence
                    .unwrap_or(0)
                    .cmp(&b.sequence.unwrap_or(0))
                    .then_with(|| a.start_time.cmp(&b.start_time))
            });
            connections.extend(route.windows(2).map(|pair| RouteConnection {
                order_no: order_no.clone(),
                from_id: pair[0].id.clone(),
                to_id: pair[1].id.clone(),
            }));
        }
        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use chrono::NaiveDate;

    fn at(h: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn op(id: &str, order: &str, resource: &str, start: u32, end: u32) -> Operation {
        let mut op = Operation::new(order, resource, at(start), at(end));
        op.id = id.to_string();
        op
    }

    fn sample() -> Vec<Operation> {
        vec![
            op("a", "ZL-1", "M2", 0, 2),
            op("b", "ZL-2", "M1", 1, 3),
            op("c", "ZL-1", "M1", 2, 4),
            op("d", "ZL-2", "M1", 1, 2),
        ]
    }

    #[test]
    fn test_rows_grouped_in_first_seen_order() {
        let ops = sample();
        let layout = LayoutEngine::default().build(&ops, &ViewFilters::default());
        let names: Vec<&str> = layout.rows.iter().map(|r| r.resource.as_str()).collect();
        assert_eq!(names, vec!["M2", "M1"]);

        let m1 = layout.row("M1").unwrap();
        assert_eq!(m1.lane_count(), 2);
        assert_eq!(m1.height, 2.0 * 24.0 + 4.0);
        assert_eq!(m1.top, 24.0 + 16.0);
        assert_eq!(layout.total_height, m1.bottom() + 16.0);
    }

    #[test]
    fn test_filters_and_resource_order() {
        let ops = sample();
        let filters = ViewFilters {
            resource_order: vec!["M1".to_string()],
            ..Default::default()
        };
        let layout = LayoutEngine::default().build(&ops, &filters);
        assert_eq!(layout.rows[0].resource, "M1");
        assert_eq!(layout.rows[0].top, 0.0);
        assert_eq!(layout.rows[1].top, 52.0 + 16.0);

        let filters = ViewFilters {
            selected_order_ids: vec!["ZL-1".to_string()],
            ..Default::default()
        };
        let layout = LayoutEngine::default().build(&ops, &filters);
        assert_eq!(layout.rows.len(), 2);
        assert!(layout.rows.iter().all(|r| r.lane_count() == 1));
    }

    #[test]
    fn test_empty_layout() {
        let layout = LayoutEngine::default().build(&[], &ViewFilters::default());
        assert!(layout.rows.is_empty());
        assert_eq!(layout.total_height, 0.0);
        assert_eq!(LayoutEngine::default().row_height(0), 24.0);
    }

    #[test]
    fn test_route_rank_uses_op_number_digits() {
        let mut a = op("a", "ZL-1", "M1", 0, 1);
        a.op_no = Some("20a".to_string());
        let mut b = op("b", "ZL-1", "M1", 0, 1);
        b.op_no = Some("x".to_string());
        b.sequence = Some(5);
        assert_eq!(route_rank(&a), 20);
        assert_eq!(route_rank(&b), 5);
        assert_eq!(leading_integer("abc"), None);
    }

    #[test]
    fn test_route_connections_follow_sequence() {
        let mut ops = sample();
        ops[0].sequence = Some(2);
        ops[2].sequence = Some(1);
        let conns = LayoutEngine::default().route_connections(&ops, &["ZL-1".to_string()]);
        assert_eq!(
            conns,
            vec![RouteConnection {
                order_no: "ZL-1".to_string(),
                from_id: "c".to_string(),
                to_id: "a".to_string(),
            }]
        );
    }
}
