// ==========================================
// 生产排程甘特图 - 文件解析器实现
// ==========================================
// 支持: 分隔文本 (.csv/.txt/.tsv) / 工作簿 (.xlsx/.xlsm/.xlsb/.xls/.ods)
// 流程: 编码检测(BOM) → 分隔符检测 → 分块读取（每块报告进度、检查取消并让出运行时）
// 说明: 本层只产出 CellValue，日期消歧由处理器负责
// ==========================================

use crate::domain::{ImportProgress, ImportStage};
use crate::importer::cancellation::CancellationToken;
use crate::importer::cell::CellValue;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::importer_trait::{FileParser, ProgressSink};
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::ReaderBuilder;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

/// 默认分块大小（行）
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// 分隔符检测采样长度（字符）
const SEPARATOR_SAMPLE_CHARS: usize = 1000;

const CANDIDATE_SEPARATORS: [u8; 4] = [b',', b';', b'\t', b'|'];

// ==========================================
// 解析结果
// ==========================================

/// 文本编码（依据 BOM）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
        }
    }
}

/// 解析产出：表头 + 数据行
#[derive(Debug, Clone, Default)]
pub struct ParsedData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub total_rows: usize,
    /// 工作簿: 实际读取的工作表
    pub sheet_name: Option<String>,
    /// 分隔文本: 检测到的编码与分隔符
    pub encoding: Option<TextEncoding>,
    pub separator: Option<char>,
}

// ==========================================
// 编码与分隔符检测
// ==========================================

/// 依据 BOM 检测编码，无 BOM 视为 UTF-8
pub fn detect_encoding(bytes: &[u8]) -> TextEncoding {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => TextEncoding::Utf8Bom,
        [0xFF, 0xFE, ..] => TextEncoding::Utf16Le,
        [0xFE, 0xFF, ..] => TextEncoding::Utf16Be,
        _ => TextEncoding::Utf8,
    }
}

/// 解码为文本（去除 BOM；非法序列按替换字符处理）
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    let encoding = detect_encoding(bytes);
    let text = match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf8Bom => String::from_utf8_lossy(&bytes[3..]).into_owned(),
        TextEncoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes),
        TextEncoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes),
    };
    (text, encoding)
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// 统计前 1000 个字符中各候选分隔符出现次数，取最多者（并列取靠前者，默认逗号）
pub fn detect_separator(text: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_SEPARATORS.len()];
    for ch in text.chars().take(SEPARATOR_SAMPLE_CHARS) {
        if let Some(idx) = CANDIDATE_SEPARATORS.iter().position(|&s| s as char == ch) {
            counts[idx] += 1;
        }
    }
    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    CANDIDATE_SEPARATORS[best]
}

/// 是否为工作簿（ZIP 容器或 OLE 复合文档）
pub fn looks_like_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

fn progress_update(
    progress: &dyn ProgressSink,
    stage: ImportStage,
    processed: usize,
    total: usize,
) {
    progress.report(&ImportProgress::new(stage, processed, total));
}

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvParser {
    pub chunk_size: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CsvParser {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// 解析分隔文本
    ///
    /// 第一条非空记录为表头；全空白行跳过；各行长度允许不一致
    pub async fn parse_delimited(
        &self,
        bytes: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData> {
        cancel.checkpoint()?;
        let (text, encoding) = decode_text(bytes);
        let separator = detect_separator(&text);
        let separator_char = separator as char;
        tracing::debug!(
            encoding = encoding.as_str(),
            separator = ?separator_char,
            bytes = bytes.len(),
            "分隔文本格式检测完成"
        );

        // 行数估计仅用于进度百分比
        let estimated_rows = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
            .saturating_sub(1);

        let mut reader = ReaderBuilder::new()
            .delimiter(separator)
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(text.as_bytes());

        let mut headers: Option<Vec<String>> = None;
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        let chunk_size = self.chunk_size.max(1);

        for result in reader.records() {
            let record = result?;
            // 跳过完全空白的行
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            if headers.is_none() {
                headers = Some(record.iter().map(|h| h.trim().to_string()).collect());
                continue;
            }

            rows.push(record.iter().map(CellValue::from).collect());

            if rows.len() % chunk_size == 0 {
                cancel.checkpoint()?;
                let total = estimated_rows.max(rows.len());
                progress_update(progress, ImportStage::Parsing, rows.len(), total);
                tokio::task::yield_now().await;
            }
        }

        cancel.checkpoint()?;
        let total_rows = rows.len();
        progress_update(progress, ImportStage::Parsing, total_rows, total_rows);

        Ok(ParsedData {
            headers: headers.unwrap_or_default(),
            rows,
            total_rows,
            sheet_name: None,
            encoding: Some(encoding),
            separator: Some(separator_char),
        })
    }
}

#[async_trait]
impl FileParser for CsvParser {
    async fn parse_bytes(
        &self,
        bytes: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData> {
        self.parse_delimited(bytes, progress, cancel).await
    }
}

// ==========================================
// Workbook Parser 实现
// ==========================================
#[derive(Debug, Clone)]
pub struct WorkbookParser {
    /// None: 第一个工作表
    pub sheet_name: Option<String>,
    /// 表头行（从 1 开始，按工作表中的行号）
    pub header_row: usize,
    pub chunk_size: usize,
}

impl Default for WorkbookParser {
    fn default() -> Self {
        Self {
            sheet_name: None,
            header_row: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl WorkbookParser {
    pub fn new(sheet_name: Option<String>, header_row: usize, chunk_size: usize) -> Self {
        Self {
            sheet_name,
            header_row,
            chunk_size: chunk_size.max(1),
        }
    }

    /// 解析工作簿中的一个工作表
    ///
    /// # 错误
    /// - SheetNotFound: 指定的工作表不存在
    /// - EmptySheet: 工作表没有任何单元格
    /// - InvalidHeaderRow: 表头行超出工作表范围
    pub async fn parse_spreadsheet(
        &self,
        bytes: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData> {
        cancel.checkpoint()?;
        progress_update(progress, ImportStage::Reading, 0, 0);

        // 工作簿句柄只在读取区域期间存活
        let (sheet_name, range) = {
            let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
            let sheet_names = workbook.sheet_names();

            let sheet_name = match &self.sheet_name {
                Some(name) => {
                    if !sheet_names.iter().any(|s| s == name) {
                        return Err(ImportError::SheetNotFound(name.clone()));
                    }
                    name.clone()
                }
                None => sheet_names.first().cloned().ok_or_else(|| {
                    ImportError::ExcelParseError("workbook has no sheets".to_string())
                })?,
            };

            let range = workbook.worksheet_range(&sheet_name)?;
            (sheet_name, range)
        };
        self.split_range(&range, sheet_name, progress, cancel).await
    }

    /// 按表头行把二维区域拆分为表头 + 数据行
    async fn split_range(
        &self,
        range: &Range<Data>,
        sheet_name: String,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData> {
        let Some((start_row, _)) = range.start() else {
            return Err(ImportError::EmptySheet(sheet_name));
        };
        if range.is_empty() {
            return Err(ImportError::EmptySheet(sheet_name));
        }

        // 区域从第一个非空单元格开始，表头行号按工作表绝对行号换算
        let sheet_rows = start_row as usize + range.height();
        let header_idx = self.header_row.checked_sub(1).filter(|idx| {
            *idx >= start_row as usize && *idx < sheet_rows
        });
        let Some(header_idx) = header_idx else {
            return Err(ImportError::InvalidHeaderRow {
                row: self.header_row,
                rows: sheet_rows,
            });
        };
        let header_offset = header_idx - start_row as usize;

        let mut grid = range.rows().skip(header_offset);
        let headers: Vec<String> = grid
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| CellValue::from(cell).to_text().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let estimated_rows = range.height().saturating_sub(header_offset + 1);
        let chunk_size = self.chunk_size.max(1);
        let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(estimated_rows);

        for data_row in grid {
            let values: Vec<CellValue> = data_row.iter().map(CellValue::from).collect();
            // 跳过完全空白的行
            if values.iter().all(CellValue::is_blank) {
                continue;
            }
            rows.push(values);

            if rows.len() % chunk_size == 0 {
                cancel.checkpoint()?;
                progress_update(progress, ImportStage::Parsing, rows.len(), estimated_rows);
                tokio::task::yield_now().await;
            }
        }

        cancel.checkpoint()?;
        let total_rows = rows.len();
        progress_update(progress, ImportStage::Parsing, total_rows, total_rows);
        tracing::debug!(
            sheet = sheet_name.as_str(),
            header_row = self.header_row,
            rows = total_rows,
            "工作表解析完成"
        );

        Ok(ParsedData {
            headers,
            rows,
            total_rows,
            sheet_name: Some(sheet_name),
            encoding: None,
            separator: None,
        })
    }
}

#[async_trait]
impl FileParser for WorkbookParser {
    async fn parse_bytes(
        &self,
        bytes: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData> {
        self.parse_spreadsheet(bytes, progress, cancel).await
    }
}

// ==========================================
// inspect - 工作表枚举（不解析单元格内容）
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookInfo {
    /// 分隔文本为 None
    pub sheet_names: Option<Vec<String>>,
}

pub fn inspect(bytes: &[u8]) -> ImporterResult<WorkbookInfo> {
    if !looks_like_workbook(bytes) {
        return Ok(WorkbookInfo { sheet_names: None });
    }
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    Ok(WorkbookInfo {
        sheet_names: Some(workbook.sheet_names()),
    })
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Delimited,
    Workbook,
}

impl FileKind {
    pub fn from_path(path: &Path) -> ImporterResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "csv" | "txt" | "tsv" => Ok(FileKind::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileKind::Workbook),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
    pub sheets: Option<Vec<String>>,
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub sheet_name: Option<String>,
    pub header_row: usize,
    pub chunk_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            sheet_name: None,
            header_row: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UniversalFileParser {
    pub options: ParseOptions,
}

impl UniversalFileParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    fn read_bytes(path: &Path) -> ImporterResult<Vec<u8>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    pub async fn parse<P: AsRef<Path>>(
        &self,
        file_path: P,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData> {
        let path = file_path.as_ref();
        let kind = FileKind::from_path(path)?;
        let bytes = Self::read_bytes(path)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), ?kind, "开始解析文件");

        let parser: Box<dyn FileParser> = match kind {
            FileKind::Delimited => Box::new(CsvParser::new(self.options.chunk_size)),
            FileKind::Workbook => Box::new(WorkbookParser::new(
                self.options.sheet_name.clone(),
                self.options.header_row,
                self.options.chunk_size,
            )),
        };
        parser.parse_bytes(&bytes, progress, cancel).await
    }

    /// 文件信息（工作簿附带工作表列表）
    pub fn info<P: AsRef<Path>>(&self, file_path: P) -> ImporterResult<FileInfo> {
        let path = file_path.as_ref();
        let kind = FileKind::from_path(path)?;
        let bytes = Self::read_bytes(path)?;
        let sheets = match kind {
            FileKind::Workbook => inspect(&bytes)?.sheet_names,
            FileKind::Delimited => None,
        };
        Ok(FileInfo {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: bytes.len() as u64,
            kind,
            sheets,
        })
    }
}
