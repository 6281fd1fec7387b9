// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供集成测试所需的工序构造、排程行生成、临时 CSV 文件等功能
// 说明: 各测试文件通过 `mod test_helpers;` 引入，未使用的函数不告警
// ==========================================

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use production_gantt::domain::{FieldMapping, LogicalField, Operation, Timestamp};
use production_gantt::importer::CellValue;
use std::error::Error;
use std::io::Write;
use tempfile::NamedTempFile;

/// 排程表头（波兰语列名，字段映射可自动识别）
pub const SCHEDULE_HEADERS: [&str; 5] = ["Zlecenie", "Maszyna", "Od", "Do", "Operacja"];

const MACHINES: [&str; 6] = ["CNC-01", "CNC-02", "TOKARKA-1", "FREZARKA-2", "PIEC", "MONTAŻ"];

/// 构造时间点
pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// 相对基准时间的分钟偏移
pub fn base_plus(minutes: i64) -> Timestamp {
    ts(2025, 1, 6, 6, 0) + Duration::minutes(minutes)
}

/// 构造只含必填字段的工序
pub fn op(order_no: &str, resource: &str, start: Timestamp, end: Timestamp) -> Operation {
    Operation::new(order_no, resource, start, end)
}

pub fn schedule_headers() -> Vec<String> {
    SCHEDULE_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// 与 SCHEDULE_HEADERS 对应的显式映射
pub fn schedule_mapping() -> FieldMapping {
    let mut mapping = FieldMapping::default();
    mapping.set(LogicalField::OrderNo, "Zlecenie");
    mapping.set(LogicalField::Resource, "Maszyna");
    mapping.set(LogicalField::StartTime, "Od");
    mapping.set(LogicalField::EndTime, "Do");
    mapping.set(LogicalField::OpNo, "Operacja");
    mapping
}

pub fn text_row(values: &[&str]) -> Vec<CellValue> {
    values.iter().map(|v| CellValue::from(*v)).collect()
}

/// 第 i 条排程行（订单号、机台、开始、结束、工序号），彼此互不重复
pub fn plan_values(i: usize) -> [String; 5] {
    let start = base_plus(i as i64 * 7);
    let end = start + Duration::minutes(30 + (i as i64 * 13) % 240);
    [
        format!("ZL-{:06}", i),
        MACHINES[i % MACHINES.len()].to_string(),
        start.format("%d.%m.%Y %H:%M").to_string(),
        end.format("%d.%m.%Y %H:%M").to_string(),
        ((i % 4 + 1) * 10).to_string(),
    ]
}

/// 生成 n 行排程，每 100 行中前 bad_percent 行的开始时间不可解析
pub fn generated_rows(n: usize, bad_percent: usize) -> Vec<Vec<CellValue>> {
    (0..n)
        .map(|i| {
            let mut values = plan_values(i);
            if i % 100 < bad_percent {
                values[2] = format!("??.{:02}.2025", i % 28 + 1);
            }
            values.iter().map(|v| CellValue::from(v.as_str())).collect()
        })
        .collect()
}

/// 将表头与行写入临时 .csv 文件（分号分隔）
///
/// # 返回
/// - NamedTempFile: 临时文件（需要保持存活）
pub fn write_csv_file(headers: &[&str], rows: &[Vec<String>]) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    writeln!(file, "{}", headers.join(";"))?;
    for row in rows {
        writeln!(file, "{}", row.join(";"))?;
    }
    file.flush()?;
    Ok(file)
}

/// 线性同余序列（确定性的区间集合生成）
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound.max(1)
    }
}

/// 在同一资源上生成 n 个正长度区间
pub fn random_operations(seed: u64, n: usize) -> Vec<Operation> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|i| {
            let start = base_plus(rng.below(24 * 60) as i64);
            let length = 5 + rng.below(180) as i64;
            op(&format!("ZL-{}", i), "M1", start, start + Duration::minutes(length))
        })
        .collect()
}
