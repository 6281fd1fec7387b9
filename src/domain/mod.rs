// ==========================================
// 生产排程甘特图 - 领域层
// ==========================================
// 职责: 实体与值类型，不含 IO
// ==========================================

pub mod import;
pub mod mapping;
pub mod operation;
pub mod view;

// 重导出核心类型
pub use import::{
    ErrorBreakdown, ImportDiagnostics, ImportProgress, ImportResult, ImportStage, IssueKind,
    RowIssue,
};
pub use mapping::{FieldMapping, LogicalField, MappingProfile, Transformation};
pub use operation::{BlockedFlag, Operation, OperationStatus, Timestamp};
pub use view::{ViewFilters, ViewState, ZoomLimits};
