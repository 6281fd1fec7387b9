// ==========================================
// 生产排程甘特图 - 导入层
// ==========================================
// 职责: 文件字节流 → 表头 + 单元格行 → 工序集合 + 行级诊断
// 支持: CSV / TXT / TSV, XLSX / XLS / XLSB / ODS
// ==========================================

// 模块声明
pub mod cancellation;
pub mod cell;
pub mod date_normalizer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod processor;
pub mod report;
pub mod transform;

// 重导出核心类型
pub use cancellation::{CancellationSource, CancellationToken};
pub use cell::CellValue;
pub use date_normalizer::{DateNormalizer, DATE_PATTERNS};
pub use error::{ImportError, ImporterResult};
pub use field_mapper::{
    default_mapping, header_fingerprint, FieldMapper, InMemoryProfileStore, MappingSuggestion,
    MappingValidation,
};
pub use file_parser::{
    inspect, CsvParser, FileInfo, FileKind, ParseOptions, ParsedData, UniversalFileParser,
    WorkbookInfo, WorkbookParser,
};
pub use processor::{ImportOptions, ImportProcessor};
pub use transform::ValueTransformer;

// 重导出 Trait 接口
pub use importer_trait::{FileParser, NoProgress, ProfileStore, ProgressSink};
