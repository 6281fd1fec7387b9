// ==========================================
// 生产排程甘特图 - 工序领域模型
// ==========================================
// 职责: 定义排程的基本单元（工序）及其运行态字段
// 用途: 导入层写入，引擎层只读（泳道打包/视口计算不修改工序）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 时间点（墙钟时间，无时区）
///
/// 排程源文件不携带时区信息；毫秒时间戳与带偏移的 ISO 字符串
/// 统一换算为 UTC 墙钟后存储。
pub type Timestamp = NaiveDateTime;

// ==========================================
// Operation - 工序
// ==========================================
// 不变量: end_time >= start_time（导入归一化之后）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    // ===== 主键 =====
    pub id: String, // 导入时生成的唯一标识（UUID v4）

    // ===== 必填字段 =====
    pub order_no: String,        // 订单号（工艺路线分组）
    pub resource: String,        // 资源/机台
    pub start_time: Timestamp,   // 开始时间
    pub end_time: Timestamp,     // 结束时间

    // ===== 可选字段 =====
    pub op_no: Option<String>,
    pub part_no: Option<String>,
    pub product_name: Option<String>,
    pub qty: Option<f64>,
    pub operation_id: Option<String>, // 外部工序 ID
    pub sequence: Option<i64>,        // 工艺路线顺序
    pub notes: Option<String>,

    // ===== 运行态字段（人工录入，由外部持久化合并）=====
    pub actual_start: Option<Timestamp>,
    pub actual_end: Option<Timestamp>,
    pub blocked: Option<BlockedFlag>,
}

/// 阻塞标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedFlag {
    pub flag: bool,
    pub note: Option<String>,
}

impl Operation {
    /// 创建只含必填字段的工序（自动生成 ID）
    pub fn new(
        order_no: impl Into<String>,
        resource: impl Into<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            order_no: order_no.into(),
            resource: resource.into(),
            start_time,
            end_time,
            op_no: None,
            part_no: None,
            product_name: None,
            qty: None,
            operation_id: None,
            sequence: None,
            notes: None,
            actual_start: None,
            actual_end: None,
            blocked: None,
        }
    }

    /// 工序时长（毫秒）
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    /// 半开区间 [start, end) 是否与另一工序重叠
    pub fn overlaps(&self, other: &Operation) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.as_ref().map(|b| b.flag).unwrap_or(false)
    }
}

// ==========================================
// OperationStatus - 工序状态（派生，不落库）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// 已阻塞
    Blocked,
    /// 已完成（有实际结束）
    Done,
    /// 进行中（有实际开始）
    InProgress,
    /// 当班到期
    DueNow,
    /// 已逾期
    Late,
    /// 计划中
    Planned,
}

impl OperationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OperationStatus::Blocked => "BLOCKED",
            OperationStatus::Done => "DONE",
            OperationStatus::InProgress => "IN_PROGRESS",
            OperationStatus::DueNow => "DUE_NOW",
            OperationStatus::Late => "LATE",
            OperationStatus::Planned => "PLANNED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_generates_unique_ids() {
        let a = Operation::new("ZL-1", "M1", at(1), at(2));
        let b = Operation::new("ZL-1", "M1", at(1), at(2));
        assert_ne!(a.id, b.id);
        assert_eq!(a.duration_ms(), 3_600_000);
    }

    #[test]
    fn test_overlaps_is_half_open() {
        let a = Operation::new("ZL-1", "M1", at(0), at(2));
        let b = Operation::new("ZL-1", "M1", at(2), at(4));
        let c = Operation::new("ZL-1", "M1", at(1), at(3));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&OperationStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(OperationStatus::DueNow.as_str(), "DUE_NOW");
    }
}
