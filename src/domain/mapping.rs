// ==========================================
// 生产排程甘特图 - 字段映射模型
// ==========================================
// 职责: 逻辑字段 ↔ 源文件列名 的绑定关系 + 列值转换规则 + 映射档案
// 说明: 列名为空字符串表示未绑定
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// LogicalField - 逻辑字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalField {
    OrderNo,
    Resource,
    StartTime,
    EndTime,
    OpNo,
    PartNo,
    ProductName,
    Qty,
    OperationId,
    Sequence,
    Notes,
    DateColumn,
    TimeColumn,
}

impl LogicalField {
    /// 全部逻辑字段（别名匹配按此顺序进行）
    pub const ALL: [LogicalField; 13] = [
        LogicalField::OrderNo,
        LogicalField::Resource,
        LogicalField::StartTime,
        LogicalField::EndTime,
        LogicalField::OpNo,
        LogicalField::PartNo,
        LogicalField::ProductName,
        LogicalField::Qty,
        LogicalField::OperationId,
        LogicalField::Sequence,
        LogicalField::Notes,
        LogicalField::DateColumn,
        LogicalField::TimeColumn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::OrderNo => "orderNo",
            LogicalField::Resource => "resource",
            LogicalField::StartTime => "startTime",
            LogicalField::EndTime => "endTime",
            LogicalField::OpNo => "opNo",
            LogicalField::PartNo => "partNo",
            LogicalField::ProductName => "productName",
            LogicalField::Qty => "qty",
            LogicalField::OperationId => "operationId",
            LogicalField::Sequence => "sequence",
            LogicalField::Notes => "notes",
            LogicalField::DateColumn => "dateColumn",
            LogicalField::TimeColumn => "timeColumn",
        }
    }
}

// ==========================================
// FieldMapping - 字段映射
// ==========================================
// 不变量: order_no / resource / start_time / end_time 必须绑定
//         （使用 日期+时间 拆分列时 start_time 可不绑定）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMapping {
    pub order_no: String,
    pub resource: String,
    pub start_time: String,
    pub end_time: String,
    pub op_no: String,
    pub part_no: String,
    pub product_name: String,
    pub qty: String,
    pub operation_id: String,
    pub sequence: String,
    pub notes: String,
    pub date_column: String,
    pub time_column: String,
}

impl FieldMapping {
    /// 读取某逻辑字段绑定的列名（未绑定返回 None）
    pub fn get(&self, field: LogicalField) -> Option<&str> {
        let value = match field {
            LogicalField::OrderNo => &self.order_no,
            LogicalField::Resource => &self.resource,
            LogicalField::StartTime => &self.start_time,
            LogicalField::EndTime => &self.end_time,
            LogicalField::OpNo => &self.op_no,
            LogicalField::PartNo => &self.part_no,
            LogicalField::ProductName => &self.product_name,
            LogicalField::Qty => &self.qty,
            LogicalField::OperationId => &self.operation_id,
            LogicalField::Sequence => &self.sequence,
            LogicalField::Notes => &self.notes,
            LogicalField::DateColumn => &self.date_column,
            LogicalField::TimeColumn => &self.time_column,
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// 绑定某逻辑字段到列名
    pub fn set(&mut self, field: LogicalField, column: impl Into<String>) {
        let column = column.into();
        match field {
            LogicalField::OrderNo => self.order_no = column,
            LogicalField::Resource => self.resource = column,
            LogicalField::StartTime => self.start_time = column,
            LogicalField::EndTime => self.end_time = column,
            LogicalField::OpNo => self.op_no = column,
            LogicalField::PartNo => self.part_no = column,
            LogicalField::ProductName => self.product_name = column,
            LogicalField::Qty => self.qty = column,
            LogicalField::OperationId => self.operation_id = column,
            LogicalField::Sequence => self.sequence = column,
            LogicalField::Notes => self.notes = column,
            LogicalField::DateColumn => self.date_column = column,
            LogicalField::TimeColumn => self.time_column = column,
        }
    }

    /// 是否使用 日期列 + 时间列 拆分表示开始时间
    pub fn uses_date_time_split(&self) -> bool {
        self.get(LogicalField::DateColumn).is_some() && self.get(LogicalField::TimeColumn).is_some()
    }
}

// ==========================================
// Transformation - 列值转换规则
// ==========================================
// 按顺序应用（不区分大小写的正则替换），之后统一做 逗号→点 归一化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub pattern: String,
    pub replacement: String,
}

impl Transformation {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

// ==========================================
// MappingProfile - 映射档案（由外部存储保存/加载）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingProfile {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub mapping: FieldMapping,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    pub created_at: DateTime<Utc>,
    pub header_hash: Option<String>,
}

impl MappingProfile {
    pub fn new(name: impl Into<String>, mapping: FieldMapping, header_hash: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            is_default: false,
            mapping,
            transformations: Vec::new(),
            created_at: Utc::now(),
            header_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_treats_blank_as_unbound() {
        let mut mapping = FieldMapping::default();
        mapping.set(LogicalField::OrderNo, "Zlecenie");
        mapping.set(LogicalField::Resource, "   ");
        assert_eq!(mapping.get(LogicalField::OrderNo), Some("Zlecenie"));
        assert_eq!(mapping.get(LogicalField::Resource), None);
    }

    #[test]
    fn test_date_time_split_requires_both_columns() {
        let mut mapping = FieldMapping::default();
        mapping.set(LogicalField::DateColumn, "Data");
        assert!(!mapping.uses_date_time_split());
        mapping.set(LogicalField::TimeColumn, "Godzina");
        assert!(mapping.uses_date_time_split());
    }

    #[test]
    fn test_mapping_serde_camel_case() {
        let mut mapping = FieldMapping::default();
        mapping.set(LogicalField::StartTime, "Od");
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["startTime"], "Od");

        let parsed: FieldMapping = serde_json::from_str(r#"{"orderNo":"Nr"}"#).unwrap();
        assert_eq!(parsed.order_no, "Nr");
        assert_eq!(parsed.resource, "");
    }
}
