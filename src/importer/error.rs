// ==========================================
// 生产排程甘特图 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 运行级错误（整批失败）在此定义；
//       行级问题见 domain::import::RowIssue（不中断批次）
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (expected .csv/.txt/.xlsx/.xlsm/.xls/.ods)")]
    UnsupportedFormat(String),

    #[error("failed to read file: {0}")]
    FileReadError(String),

    #[error("spreadsheet parse failed: {0}")]
    ExcelParseError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    #[error("sheet \"{0}\" not found")]
    SheetNotFound(String),

    #[error("sheet \"{0}\" is empty")]
    EmptySheet(String),

    #[error("header row {row} is out of range (sheet has {rows} rows)")]
    InvalidHeaderRow { row: usize, rows: usize },

    // ===== 映射/转换错误 =====
    #[error("invalid field mapping: {}", .0.join("; "))]
    InvalidMapping(Vec<String>),

    #[error("invalid transformation pattern \"{pattern}\": {message}")]
    InvalidTransformation { pattern: String, message: String },

    #[error("spreadsheet error value in column \"{column}\": {value}")]
    CellError {
        row: usize,
        column: String,
        value: String,
    },

    // ===== 配置错误 =====
    #[error("failed to read config (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("invalid config value (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 运行控制 =====
    #[error("operation cancelled")]
    Cancelled,

    // ===== 通用错误 =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为用户主动取消（区别于真实解析失败）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportError::Cancelled)
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ConfigReadError {
            key: "json".to_string(),
            message: err.to_string(),
        }
    }
}

// 实现 From<regex::Error>（调用方已知 pattern 时应直接构造 InvalidTransformation）
impl From<regex::Error> for ImportError {
    fn from(err: regex::Error) -> Self {
        ImportError::InvalidTransformation {
            pattern: String::new(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImporterResult<T> = Result<T, ImportError>;
