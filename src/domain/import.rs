// ==========================================
// 生产排程甘特图 - 导入结果/进度模型
// ==========================================
// 职责: 每次导入运行新建，交给调用方后丢弃（不落库）
// 守恒: parsed_ok + 各类跳过数 + duplicates_dropped == total
// ==========================================

use crate::domain::operation::Operation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ==========================================
// ImportStage - 导入阶段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Reading,
    Parsing,
    Validating,
    Saving,
    Complete,
}

// ==========================================
// ErrorBreakdown - 错误分类计数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBreakdown {
    pub missing_fields: usize,
    pub date_parsing_errors: usize,
    pub date_normalization_failures: usize,
    pub duplicates: usize,
    pub other: usize,
}

// ==========================================
// ImportDiagnostics - 运行诊断（仅供排查，不影响控制流）
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDiagnostics {
    pub processed_rows: usize,
    pub valid_operations: usize,
    pub skipped_rows: usize,
    pub date_normalizations: usize,
    pub avg_row_time: Duration,
    pub slowest_row_time: Duration,
    /// 最慢行的行号（1 起）
    pub slowest_row: usize,
    pub elapsed: Duration,
    pub error_breakdown: ErrorBreakdown,
}

// ==========================================
// ImportProgress - 进度回调载荷
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub stage: ImportStage,
    /// 0..=100
    pub progress: f64,
    pub processed_rows: usize,
    pub total_rows: usize,
    /// 最近错误的前若干条（完整列表在 ImportResult 中）
    pub errors: Vec<String>,
    pub can_cancel: bool,
    pub diagnostics: Option<ImportDiagnostics>,
}

impl ImportProgress {
    pub fn new(stage: ImportStage, processed_rows: usize, total_rows: usize) -> Self {
        let progress = if total_rows > 0 {
            (processed_rows as f64 / total_rows as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        Self {
            stage,
            progress,
            processed_rows,
            total_rows,
            errors: Vec::new(),
            can_cancel: stage != ImportStage::Complete,
            diagnostics: None,
        }
    }
}

// ==========================================
// RowIssue - 行级问题
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    MissingField,
    InvalidDate,
    YearOutOfRange,
    EndBeforeStart,
    Other,
}

impl IssueKind {
    pub fn as_str(&self) -> &str {
        match self {
            IssueKind::MissingField => "MISSING_FIELD",
            IssueKind::InvalidDate => "INVALID_DATE",
            IssueKind::YearOutOfRange => "YEAR_OUT_OF_RANGE",
            IssueKind::EndBeforeStart => "END_BEFORE_START",
            IssueKind::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    /// 数据行号（1 起，不含表头）
    pub row: usize,
    pub kind: IssueKind,
    /// 面向操作员的完整消息
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total: usize,
    #[serde(rename = "parsedOK")]
    pub parsed_ok: usize,
    pub skipped_missing: usize,
    pub skipped_date_error: usize,
    pub skipped_end_before_start: usize,
    pub duplicates_dropped: usize,
    /// 未预期的行级错误（计入 "other"）
    pub skipped_other: usize,
    /// 行级问题，完整保留、不截断
    pub errors: Vec<RowIssue>,
    pub operations: Vec<Operation>,
    pub diagnostics: ImportDiagnostics,
}

impl ImportResult {
    /// 所有被丢弃的行数
    pub fn skipped(&self) -> usize {
        self.skipped_missing
            + self.skipped_date_error
            + self.skipped_end_before_start
            + self.duplicates_dropped
            + self.skipped_other
    }

    /// 行数守恒检查
    pub fn is_balanced(&self) -> bool {
        self.parsed_ok + self.skipped() == self.total
    }

    /// 行级错误消息（按出现顺序）
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}
