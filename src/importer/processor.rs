// ==========================================
// 生产排程甘特图 - 导入处理器
// ==========================================
// 职责: 表头 + 单元格行 + 字段映射 → 工序集合 + 行级诊断
// 流程（逐行）:
//   1. 列索引表（循环前解析一次）
//   2. 订单号/资源: 转换后为空 → skipped_missing
//   3. 开始/结束时间（直接列或 日期+时间 拆分列）→ 失败 → skipped_date_error
//   4. 年份区间校验 → skipped_date_error
//   5. 结束早于开始修复（跨午夜 / 跨年 / 兜底 +1h；相等 +1min）
//   6. 构造工序（新 UUID）
//   7. 去重（订单号+工序号+资源+开始时刻）→ duplicates_dropped
//   8. 累积；按时间节流报告进度，最后必报 100%
// 失败语义: 取消 → ImportError::Cancelled；行内异常 → 计入 other，不中断批次
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{
    FieldMapping, ImportDiagnostics, ImportProgress, ImportResult, ImportStage, IssueKind,
    LogicalField, Operation, RowIssue, Timestamp, Transformation,
};
use crate::i18n;
use crate::importer::cancellation::CancellationToken;
use crate::importer::cell::CellValue;
use crate::importer::date_normalizer::DateNormalizer;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::ParsedData;
use crate::importer::importer_trait::ProgressSink;
use crate::importer::transform::ValueTransformer;
use chrono::{Datelike, Duration, NaiveTime, Timelike};
use std::collections::HashSet;
use std::time::{Duration as StdDuration, Instant};
use tracing::instrument;

/// 进度回调中携带的错误条数上限（结果中的错误列表不受限）
const PROGRESS_ERROR_PREVIEW: usize = 10;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// 单次导入的映射与转换规则
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub mapping: FieldMapping,
    pub transformations: Vec<Transformation>,
}

impl ImportOptions {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            transformations: Vec::new(),
        }
    }

    pub fn with_transformations(mut self, transformations: Vec<Transformation>) -> Self {
        self.transformations = transformations;
        self
    }
}

// ==========================================
// ColumnIndex - 列索引表
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
struct ColumnIndex {
    order_no: Option<usize>,
    resource: Option<usize>,
    start_time: Option<usize>,
    end_time: Option<usize>,
    op_no: Option<usize>,
    part_no: Option<usize>,
    product_name: Option<usize>,
    qty: Option<usize>,
    operation_id: Option<usize>,
    sequence: Option<usize>,
    notes: Option<usize>,
    date_column: Option<usize>,
    time_column: Option<usize>,
    split: bool,
}

impl ColumnIndex {
    fn resolve(headers: &[String], mapping: &FieldMapping) -> Self {
        let find = |field: LogicalField| -> Option<usize> {
            let column = mapping.get(field)?;
            headers.iter().position(|h| h.trim() == column)
        };
        Self {
            order_no: find(LogicalField::OrderNo),
            resource: find(LogicalField::Resource),
            start_time: find(LogicalField::StartTime),
            end_time: find(LogicalField::EndTime),
            op_no: find(LogicalField::OpNo),
            part_no: find(LogicalField::PartNo),
            product_name: find(LogicalField::ProductName),
            qty: find(LogicalField::Qty),
            operation_id: find(LogicalField::OperationId),
            sequence: find(LogicalField::Sequence),
            notes: find(LogicalField::Notes),
            date_column: find(LogicalField::DateColumn),
            time_column: find(LogicalField::TimeColumn),
            split: mapping.uses_date_time_split(),
        }
    }
}

fn cell_at(row: &[CellValue], idx: Option<usize>) -> &CellValue {
    idx.and_then(|i| row.get(i)).unwrap_or(&EMPTY_CELL)
}

// ==========================================
// 行处理结果
// ==========================================
enum RowOutcome {
    Parsed {
        operation: Operation,
        normalized: bool,
    },
    MissingField,
    InvalidDate {
        start_raw: String,
        end_raw: String,
    },
    YearOutOfRange {
        start: Timestamp,
        end: Timestamp,
    },
    EndBeforeStart {
        start: Timestamp,
        end: Timestamp,
    },
}

/// 结束早于开始的修复结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndRepair {
    /// 无需修复
    Unchanged,
    /// 同日 → 结束 +24h
    CrossedMidnight,
    /// 开始 9–12 月、结束 1–3 月、同年 → 结束 +1 年
    CrossedYear,
    /// 兜底 → 开始 +1h
    Fallback,
    /// 相等 → 开始 +1min
    ZeroLength,
}

/// 修复结束时间
///
/// 返回 (修复后的结束时间, 修复方式)
pub fn repair_end(start: Timestamp, end: Timestamp) -> (Timestamp, EndRepair) {
    if end > start {
        return (end, EndRepair::Unchanged);
    }
    if end == start {
        return (start + Duration::minutes(1), EndRepair::ZeroLength);
    }

    if end.date() == start.date() {
        let candidate = end + Duration::hours(24);
        if candidate > start {
            return (candidate, EndRepair::CrossedMidnight);
        }
    }

    if end.year() == start.year() && start.month() >= 9 && end.month() <= 3 {
        if let Some(candidate) = end.with_year(end.year() + 1) {
            if candidate > start {
                return (candidate, EndRepair::CrossedYear);
            }
        }
    }

    (start + Duration::hours(1), EndRepair::Fallback)
}

/// 去重键: (订单号, 工序号, 资源, 开始时刻 ms)
pub type DedupKey = (String, String, String, i64);

/// 按字段分别比较，字段内容中的分隔符不会造成误判
pub fn dedup_key(op: &Operation) -> DedupKey {
    (
        op.order_no.clone(),
        op.op_no.clone().unwrap_or_default(),
        op.resource.clone(),
        op.start_time.and_utc().timestamp_millis(),
    )
}

// ==========================================
// ImportProcessor - 导入处理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ImportProcessor {
    config: ImportConfig,
    normalizer: DateNormalizer,
}

/// 单次运行的只读上下文
struct RowContext<'a> {
    columns: ColumnIndex,
    headers: &'a [String],
    transformer: ValueTransformer,
}

impl ImportProcessor {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            normalizer: DateNormalizer,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 处理解析器产出
    pub async fn process_parsed(
        &self,
        parsed: &ParsedData,
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ImportResult> {
        self.process(&parsed.headers, &parsed.rows, options, progress, cancel)
            .await
    }

    /// 处理表头 + 行
    ///
    /// # 错误
    /// - InvalidMapping: 必填字段未映射
    /// - InvalidTransformation: 转换规则不是合法正则
    /// - Cancelled: 分块边界检测到取消
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn process(
        &self,
        headers: &[String],
        rows: &[Vec<CellValue>],
        options: &ImportOptions,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ImportResult> {
        let locale = self.config.locale.as_str();
        let validation = FieldMapper.validate(&options.mapping, locale);
        if !validation.is_valid {
            return Err(ImportError::InvalidMapping(validation.errors));
        }

        let ctx = RowContext {
            columns: ColumnIndex::resolve(headers, &options.mapping),
            headers,
            transformer: ValueTransformer::new(&options.transformations)?,
        };

        let started = Instant::now();
        if rows.len() > self.config.max_rows {
            tracing::warn!(
                rows = rows.len(),
                max_rows = self.config.max_rows,
                "超过单次导入行数上限，多余行被忽略"
            );
        }
        let limited = &rows[..rows.len().min(self.config.max_rows)];
        let total = limited.len();
        tracing::info!(
            total,
            split = ctx.columns.split,
            transformations = ctx.transformer.rule_count(),
            "开始处理导入数据"
        );

        let mut result = ImportResult {
            total,
            ..Default::default()
        };
        let mut diagnostics = ImportDiagnostics::default();
        let mut seen_keys: HashSet<DedupKey> = HashSet::with_capacity(total);
        let mut row_time_total = StdDuration::ZERO;
        let mut last_report: Option<Instant> = None;
        let chunk_size = self.config.chunk_size.max(1);

        for (chunk_idx, chunk) in limited.chunks(chunk_size).enumerate() {
            cancel.checkpoint()?;
            let chunk_started = Instant::now();
            let chunk_offset = chunk_idx * chunk_size;

            for (i, row) in chunk.iter().enumerate() {
                let row_started = Instant::now();
                // 从 1 开始的数据行号
                let row_no = chunk_offset + i + 1;
                diagnostics.processed_rows += 1;

                match self.process_row(&ctx, row, row_no) {
                    Ok(RowOutcome::Parsed {
                        operation,
                        normalized,
                    }) => {
                        if seen_keys.insert(dedup_key(&operation)) {
                            // 只统计被接受的行
                            if normalized {
                                diagnostics.date_normalizations += 1;
                            }
                            result.operations.push(operation);
                            result.parsed_ok += 1;
                            diagnostics.valid_operations += 1;
                        } else {
                            result.duplicates_dropped += 1;
                            diagnostics.skipped_rows += 1;
                            diagnostics.error_breakdown.duplicates += 1;
                        }
                    }
                    Ok(RowOutcome::MissingField) => {
                        result.skipped_missing += 1;
                        diagnostics.skipped_rows += 1;
                        diagnostics.error_breakdown.missing_fields += 1;
                        result.errors.push(self.issue(
                            row_no,
                            IssueKind::MissingField,
                            "import.missing_required",
                            &[],
                        ));
                    }
                    Ok(RowOutcome::InvalidDate { start_raw, end_raw }) => {
                        result.skipped_date_error += 1;
                        diagnostics.skipped_rows += 1;
                        diagnostics.error_breakdown.date_parsing_errors += 1;
                        result.errors.push(self.issue(
                            row_no,
                            IssueKind::InvalidDate,
                            "import.invalid_date",
                            &[("start", &start_raw), ("end", &end_raw)],
                        ));
                    }
                    Ok(RowOutcome::YearOutOfRange { start, end }) => {
                        result.skipped_date_error += 1;
                        diagnostics.skipped_rows += 1;
                        diagnostics.error_breakdown.date_parsing_errors += 1;
                        let (min, max) =
                            (self.config.year_min.to_string(), self.config.year_max.to_string());
                        let (start, end) = (
                            self.normalizer.format_display(&start),
                            self.normalizer.format_display(&end),
                        );
                        result.errors.push(self.issue(
                            row_no,
                            IssueKind::YearOutOfRange,
                            "import.year_out_of_range",
                            &[("min", &min), ("max", &max), ("start", &start), ("end", &end)],
                        ));
                    }
                    Ok(RowOutcome::EndBeforeStart { start, end }) => {
                        result.skipped_end_before_start += 1;
                        diagnostics.skipped_rows += 1;
                        diagnostics.error_breakdown.date_normalization_failures += 1;
                        let (start, end) = (
                            self.normalizer.format_display(&start),
                            self.normalizer.format_display(&end),
                        );
                        result.errors.push(self.issue(
                            row_no,
                            IssueKind::EndBeforeStart,
                            "import.end_before_start",
                            &[("start", &start), ("end", &end)],
                        ));
                    }
                    Err(err) => {
                        result.skipped_other += 1;
                        diagnostics.skipped_rows += 1;
                        diagnostics.error_breakdown.other += 1;
                        let message = err.to_string();
                        result.errors.push(self.issue(
                            row_no,
                            IssueKind::Other,
                            "import.cell_error",
                            &[("message", &message)],
                        ));
                    }
                }

                let row_time = row_started.elapsed();
                row_time_total += row_time;
                if row_time > diagnostics.slowest_row_time {
                    diagnostics.slowest_row_time = row_time;
                    diagnostics.slowest_row = row_no;
                }
            }

            let processed = chunk_offset + chunk.len();
            let now = Instant::now();
            let due = last_report
                .map(|at| now.duration_since(at) > self.config.progress_throttle())
                .unwrap_or(true);
            if due || processed == total {
                diagnostics.avg_row_time = average(row_time_total, diagnostics.processed_rows);
                diagnostics.elapsed = started.elapsed();
                let mut update = ImportProgress::new(ImportStage::Validating, processed, total);
                update.errors = result
                    .errors
                    .iter()
                    .take(PROGRESS_ERROR_PREVIEW)
                    .map(|e| e.message.clone())
                    .collect();
                update.diagnostics = Some(diagnostics.clone());
                progress.report(&update);
                last_report = Some(now);
            }

            let chunk_time = chunk_started.elapsed();
            if chunk_time > self.config.slow_chunk_threshold() {
                tracing::warn!(
                    chunk = chunk_idx,
                    rows = chunk.len(),
                    elapsed_ms = chunk_time.as_millis() as u64,
                    "分块处理缓慢"
                );
            }

            // 分块之间让出执行权
            tokio::task::yield_now().await;
        }

        diagnostics.avg_row_time = average(row_time_total, diagnostics.processed_rows);
        diagnostics.elapsed = started.elapsed();
        result.diagnostics = diagnostics;

        let mut done = ImportProgress::new(ImportStage::Complete, total, total);
        done.errors = result
            .errors
            .iter()
            .take(PROGRESS_ERROR_PREVIEW)
            .map(|e| e.message.clone())
            .collect();
        done.diagnostics = Some(result.diagnostics.clone());
        progress.report(&done);

        tracing::info!(
            total = result.total,
            parsed_ok = result.parsed_ok,
            skipped_missing = result.skipped_missing,
            skipped_date_error = result.skipped_date_error,
            skipped_end_before_start = result.skipped_end_before_start,
            duplicates = result.duplicates_dropped,
            other = result.skipped_other,
            normalizations = result.diagnostics.date_normalizations,
            elapsed_ms = result.diagnostics.elapsed.as_millis() as u64,
            "导入处理完成"
        );
        Ok(result)
    }

    fn issue(&self, row: usize, kind: IssueKind, key: &str, args: &[(&str, &str)]) -> RowIssue {
        let row_text = row.to_string();
        let mut all_args: Vec<(&str, &str)> = Vec::with_capacity(args.len() + 1);
        all_args.push(("row", row_text.as_str()));
        all_args.extend_from_slice(args);
        RowIssue {
            row,
            kind,
            message: i18n::t_in(&self.config.locale, key, &all_args),
        }
    }

    /// 单行处理（表格错误值 → Err，计入 other）
    fn process_row(
        &self,
        ctx: &RowContext<'_>,
        row: &[CellValue],
        row_no: usize,
    ) -> ImporterResult<RowOutcome> {
        let cols = &ctx.columns;
        let t = &ctx.transformer;

        // 2. 必填字段
        let order_no = self.required_text(ctx, row, cols.order_no, row_no)?;
        let resource = self.required_text(ctx, row, cols.resource, row_no)?;
        let (Some(order_no), Some(resource)) = (order_no, resource) else {
            return Ok(RowOutcome::MissingField);
        };

        // 3. 时间解析
        let times = if cols.split {
            self.split_times(ctx, row, row_no)?
        } else {
            let start = self.parse_cell(ctx, row, cols.start_time, row_no)?;
            let end = self.parse_cell(ctx, row, cols.end_time, row_no)?;
            start.zip(end)
        };
        let Some((start, end)) = times else {
            let (start_raw, end_raw) = if cols.split {
                (
                    format!(
                        "{} {}",
                        cell_at(row, cols.date_column).to_text(),
                        cell_at(row, cols.time_column).to_text()
                    )
                    .trim()
                    .to_string(),
                    cell_at(row, cols.end_time).to_text(),
                )
            } else {
                (
                    cell_at(row, cols.start_time).to_text(),
                    cell_at(row, cols.end_time).to_text(),
                )
            };
            return Ok(RowOutcome::InvalidDate { start_raw, end_raw });
        };

        // 4. 年份区间
        let year_ok = |ts: &Timestamp| (self.config.year_min..=self.config.year_max).contains(&ts.year());
        if !year_ok(&start) || !year_ok(&end) {
            return Ok(RowOutcome::YearOutOfRange { start, end });
        }

        // 5. 结束早于开始修复
        let (end, repair) = repair_end(start, end);
        if end < start {
            return Ok(RowOutcome::EndBeforeStart { start, end });
        }
        if repair != EndRepair::Unchanged {
            tracing::debug!(
                row = row_no,
                ?repair,
                start = %start,
                end = %end,
                "结束时间已修复"
            );
        }

        // 6. 构造工序
        let optional = |idx: Option<usize>| -> Option<String> {
            match cell_at(row, idx) {
                CellValue::Error(_) => None,
                cell => t.text(&cell.to_text()),
            }
        };
        let free_text = |idx: Option<usize>| -> Option<String> {
            match cell_at(row, idx) {
                CellValue::Error(_) => None,
                cell => t.free_text(&cell.to_text()),
            }
        };

        let mut operation = Operation::new(order_no, resource, start, end);
        operation.op_no = optional(cols.op_no);
        operation.part_no = optional(cols.part_no);
        operation.product_name = free_text(cols.product_name);
        operation.qty = match cell_at(row, cols.qty) {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Error(_) => None,
            cell => t.number(&cell.to_text()),
        };
        operation.operation_id = optional(cols.operation_id);
        operation.sequence = match cell_at(row, cols.sequence) {
            CellValue::Error(_) => None,
            cell => t.integer(&cell.to_text()),
        };
        operation.notes = free_text(cols.notes);

        Ok(RowOutcome::Parsed {
            operation,
            normalized: repair != EndRepair::Unchanged,
        })
    }

    /// 必填文本字段；表格错误值 → CellError
    fn required_text(
        &self,
        ctx: &RowContext<'_>,
        row: &[CellValue],
        idx: Option<usize>,
        row_no: usize,
    ) -> ImporterResult<Option<String>> {
        match cell_at(row, idx) {
            CellValue::Error(value) => Err(self.cell_error(ctx, idx, row_no, value)),
            cell => Ok(ctx.transformer.text(&cell.to_text())),
        }
    }

    fn cell_error(
        &self,
        ctx: &RowContext<'_>,
        idx: Option<usize>,
        row_no: usize,
        value: &str,
    ) -> ImportError {
        ImportError::CellError {
            row: row_no,
            column: idx
                .and_then(|i| ctx.headers.get(i))
                .cloned()
                .unwrap_or_default(),
            value: value.to_string(),
        }
    }

    /// 直接模式: 单元格 → 时间点
    fn parse_cell(
        &self,
        ctx: &RowContext<'_>,
        row: &[CellValue],
        idx: Option<usize>,
        row_no: usize,
    ) -> ImporterResult<Option<Timestamp>> {
        Ok(match cell_at(row, idx) {
            CellValue::Empty | CellValue::Bool(_) => None,
            CellValue::DateTime(dt) => Some(*dt),
            CellValue::Number(n) => self.normalizer.parse(&n.to_string()),
            CellValue::Text(s) => ctx
                .transformer
                .text(s)
                .and_then(|text| self.normalizer.parse(&text)),
            CellValue::Error(value) => return Err(self.cell_error(ctx, idx, row_no, value)),
        })
    }

    /// 拆分模式: 日期列 + 时间列 → 开始；结束列按同一日期解析，缺失时开始 +1h
    fn split_times(
        &self,
        ctx: &RowContext<'_>,
        row: &[CellValue],
        row_no: usize,
    ) -> ImporterResult<Option<(Timestamp, Timestamp)>> {
        let cols = &ctx.columns;
        let Some(date) = self.parse_cell(ctx, row, cols.date_column, row_no)? else {
            return Ok(None);
        };

        let time_cell = cell_at(row, cols.time_column);
        if let CellValue::Error(value) = time_cell {
            return Err(self.cell_error(ctx, cols.time_column, row_no, value));
        }
        let Some(start) = self.combine_cell(ctx, date, time_cell) else {
            return Ok(None);
        };

        let end_cell = cell_at(row, cols.end_time);
        if let CellValue::Error(value) = end_cell {
            return Err(self.cell_error(ctx, cols.end_time, row_no, value));
        }
        let end = if end_cell.is_blank() {
            None
        } else {
            self.combine_cell(ctx, date, end_cell)
        };
        Ok(Some((start, end.unwrap_or(start + Duration::hours(1)))))
    }

    /// 把时间单元格应用到日期上
    ///
    /// - 原生日期时间: 年份 < 1900 视为纯时间，否则直接作为完整时间点
    /// - 数值: [0, 1) 为一天内的时间比例，否则按日期序列号解析
    /// - 文本: 交给日期归一化器的 combine 规则
    fn combine_cell(
        &self,
        ctx: &RowContext<'_>,
        date: Timestamp,
        cell: &CellValue,
    ) -> Option<Timestamp> {
        match cell {
            CellValue::DateTime(dt) if dt.year() < 1900 => Some(on_date(date, dt.time())),
            CellValue::DateTime(dt) => Some(*dt),
            CellValue::Number(n) if (0.0..1.0).contains(n) => {
                let secs = (n * 86_400.0).round() as u32;
                NaiveTime::from_num_seconds_from_midnight_opt(secs.min(86_399), 0)
                    .map(|time| on_date(date, time))
            }
            CellValue::Number(n) => self.normalizer.parse(&n.to_string()),
            CellValue::Empty => Some(on_date(date, NaiveTime::MIN)),
            other => {
                let text = ctx.transformer.apply(&other.to_text());
                Some(self.normalizer.combine_on(date, &text))
            }
        }
    }
}

fn on_date(date: Timestamp, time: NaiveTime) -> Timestamp {
    date.date()
        .and_hms_opt(time.hour(), time.minute(), time.second())
        .unwrap_or_else(|| date.date().and_time(NaiveTime::MIN))
}

fn average(total: StdDuration, count: usize) -> StdDuration {
    if count == 0 {
        StdDuration::ZERO
    } else {
        total / count as u32
    }
}
