// ==========================================
// 生产排程甘特图 - 导入错误报告
// ==========================================
// 职责: 把行级问题导出为结构化报告（CSV: row,category,message / JSON）
// 说明: 报告写入调用方提供的 Write；写文件仅在调用方显式给出路径时发生
// ==========================================

use crate::domain::ImportResult;
use crate::importer::error::ImporterResult;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    row: usize,
    category: &'a str,
    message: &'a str,
}

/// 导入汇总（JSON 报告头部）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportSummary<'a> {
    total: usize,
    #[serde(rename = "parsedOK")]
    parsed_ok: usize,
    skipped: usize,
    duplicates_dropped: usize,
    date_normalizations: usize,
    errors: Vec<ReportRecord<'a>>,
}

impl ImportResult {
    /// 导出行级问题为 CSV（含表头 row,category,message）
    pub fn write_error_report<W: Write>(&self, writer: W) -> ImporterResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for issue in &self.errors {
            csv_writer.serialize(ReportRecord {
                row: issue.row,
                category: issue.kind.as_str(),
                message: &issue.message,
            })?;
        }
        if self.errors.is_empty() {
            csv_writer.write_record(["row", "category", "message"])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// 导出行级问题到文件
    pub fn save_error_report<P: AsRef<Path>>(&self, path: P) -> ImporterResult<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_error_report(std::io::BufWriter::new(file))?;
        tracing::info!(
            path = %path.as_ref().display(),
            errors = self.errors.len(),
            "错误报告已导出"
        );
        Ok(())
    }

    /// 汇总 + 行级问题（JSON）
    pub fn to_json(&self) -> ImporterResult<String> {
        let summary = ReportSummary {
            total: self.total,
            parsed_ok: self.parsed_ok,
            skipped: self.skipped(),
            duplicates_dropped: self.duplicates_dropped,
            date_normalizations: self.diagnostics.date_normalizations,
            errors: self
                .errors
                .iter()
                .map(|issue| ReportRecord {
                    row: issue.row,
                    category: issue.kind.as_str(),
                    message: &issue.message,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&summary)?)
    }
}
