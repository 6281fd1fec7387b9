// ==========================================
// 排程测试数据生成器
// ==========================================
// 用法: cargo run --bin generate_test_data [行数] [日期错误百分比]
// 输出: tests/fixtures/datasets/*.csv
// 说明: 数据确定性生成（不使用随机数），重复运行结果一致
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::Writer;
use std::error::Error;
use std::fs::{self, File};
use std::path::Path;

const CSV_HEADER: [&str; 5] = ["Zlecenie", "Maszyna", "Od", "Do", "Operacja"];
const MACHINES: [&str; 6] = ["CNC-01", "CNC-02", "TOKARKA-1", "FREZARKA-2", "PIEC", "MONTAŻ"];
const OUTPUT_DIR: &str = "tests/fixtures/datasets";

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let rows: usize = match args.first() {
        Some(raw) => raw.parse()?,
        None => 50_000,
    };
    let bad_percent: usize = match args.get(1) {
        Some(raw) => raw.parse()?,
        None => 5,
    };

    let dir = Path::new(OUTPUT_DIR);
    fs::create_dir_all(dir)?;

    println!("生成排程测试数据 → {}", dir.display());
    generate_normal_plan(&dir.join("01_normal_plan.csv"))?;
    generate_large_plan(&dir.join("02_large_plan.csv"), rows, bad_percent)?;
    generate_duplicates(&dir.join("03_duplicates.csv"))?;
    generate_mixed_issues(&dir.join("04_mixed_issues.csv"))?;
    println!("完成");
    Ok(())
}

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .unwrap_or_default()
}

fn fmt(ts: NaiveDateTime) -> String {
    ts.format("%d.%m.%Y %H:%M").to_string()
}

/// 第 i 条工序的 (订单号, 机台, 开始, 结束, 工序号)
fn plan_row(i: usize) -> [String; 5] {
    let start = base_time() + Duration::minutes((i as i64 * 37) % (14 * 24 * 60));
    let end = start + Duration::minutes(30 + (i as i64 * 13) % 240);
    [
        format!("ZL-{:06}", i / 4),
        MACHINES[i % MACHINES.len()].to_string(),
        fmt(start),
        fmt(end),
        ((i % 4 + 1) * 10).to_string(),
    ]
}

fn generate_normal_plan(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(path)?);
    wtr.write_record(CSV_HEADER)?;
    for i in 0..100 {
        wtr.write_record(plan_row(i))?;
    }
    wtr.flush()?;
    println!("✓ 生成 01_normal_plan.csv (100条，全部有效)");
    Ok(())
}

/// 每 100 行中前 bad_percent 行的开始时间不可解析
fn generate_large_plan(path: &Path, rows: usize, bad_percent: usize) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(path)?);
    wtr.write_record(CSV_HEADER)?;
    let mut bad = 0usize;
    for i in 0..rows {
        let mut record = plan_row(i);
        if i % 100 < bad_percent {
            record[2] = format!("??.{:02}.2025", i % 28 + 1);
            bad += 1;
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    println!(
        "✓ 生成 02_large_plan.csv ({}条，其中 {} 条日期错误)",
        rows, bad
    );
    Ok(())
}

fn generate_duplicates(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(path)?);
    wtr.write_record(CSV_HEADER)?;
    for _ in 0..2 {
        for i in 0..20 {
            wtr.write_record(plan_row(i))?;
        }
    }
    wtr.flush()?;
    println!("✓ 生成 03_duplicates.csv (40条，20条重复)");
    Ok(())
}

fn generate_mixed_issues(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(path)?);
    wtr.write_record(CSV_HEADER)?;

    // 有效
    for i in 0..20 {
        wtr.write_record(plan_row(i))?;
    }
    // 缺订单号
    wtr.write_record(["", "CNC-01", "06.01.2025 06:00", "06.01.2025 07:00", "10"])?;
    wtr.write_record(["ZL-X1", "", "06.01.2025 06:00", "06.01.2025 07:00", "10"])?;
    // 日期无法解析
    wtr.write_record(["ZL-X2", "CNC-01", "jutro", "06.01.2025 07:00", "10"])?;
    wtr.write_record(["ZL-X3", "CNC-02", "06.01.2025 06:00", "32.01.2025 07:00", "10"])?;
    // 年份越界
    wtr.write_record(["ZL-X4", "PIEC", "06.01.1999 06:00", "06.01.1999 07:00", "10"])?;
    // 当日跨午夜（自动修复为次日）
    wtr.write_record(["ZL-X5", "PIEC", "06.01.25, 22:00:00", "06.01.25, 02:00:00", "20"])?;
    // 逗号分隔日期时间
    wtr.write_record(["ZL-X6", "MONTAŻ", "07.01.2025, 08:00", "07.01.2025, 09:30", "30"])?;
    // 空行
    wtr.write_record(["", "", "", "", ""])?;
    // Excel 序列号
    wtr.write_record(["ZL-X7", "CNC-01", "45667.25", "45667.5", "40"])?;
    wtr.write_record(["ZL-X8", "CNC-02", "2025-01-08T10:00:00Z", "2025-01-08T12:00:00Z", "50"])?;

    wtr.flush()?;
    println!("✓ 生成 04_mixed_issues.csv (30条，混合问题)");
    Ok(())
}
