// ==========================================
// 生产排程甘特图 - 单元格值
// ==========================================
// 职责: 两种解析器统一产出的带标签单元格值
//       （替代运行时隐式类型转换）
// ==========================================

use crate::domain::Timestamp;
use calamine::Data;
use chrono::{Duration, NaiveDate};

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// 表格原生日期时间（time-only 单元格年份 < 1900）
    DateTime(Timestamp),
    /// 表格错误值（#REF!、#N/A 等）
    Error(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// 空值或仅空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 文本表示（数值按最短形式输出，如 45667 而非 45667.0）
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::from(s.as_str()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
                Some(ts) => CellValue::DateTime(ts),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Error(e.to_string()),
        }
    }
}

/// 表格原生日期单元格 → 日期时间
///
/// 原生日期单元格由表格软件格式化，按真实纪元换算：
/// 序列号 >= 60 以 1899-12-30 为零点，更小的序列号以 1899-12-31 为零点。
/// 纯时间单元格（序列号 < 1）落在 1899-12-31，调用方据此识别 "仅时间"。
pub fn excel_serial_to_datetime(serial: f64) -> Option<Timestamp> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // 序列号 60 即 1900-02-29，不存在，与 59 同落在 02-28
    let epoch = if serial >= 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis))
}
