// ==========================================
// 生产排程甘特图 - 引擎层
// ==========================================
// 职责: 泳道打包、视口投影、行布局、虚拟化、状态计算、事件广播、运行态合并
// 红线: 泳道/视口/布局为纯函数，可重入、可并发调用；不读写磁盘
// ==========================================

pub mod error;
pub mod events;
pub mod lane_packer;
pub mod layout;
pub mod runtime_overlay;
pub mod status;
pub mod viewport;
pub mod virtualization;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use events::{ImportEvent, ImportEventBus, ImportSummary};
pub use lane_packer::{max_overlap, pack, Interval};
pub use layout::{GanttLayout, GanttRow, LayoutEngine, RouteConnection};
pub use runtime_overlay::{
    merge_runtime, runtime_key, InMemoryRuntimeOverlayStore, RuntimeOverlay, RuntimeOverlayMap,
    RuntimeOverlayStore,
};
pub use status::{compute_status, compute_statuses, ShiftWindow, StatusRequest, StatusWorker};
pub use viewport::{
    pixel_to_time, tick_config, time_to_pixel, DaySegment, FittedWindow, Tick, TickConfig,
    TickKind, ViewportEngine, ZoomAnchor, ZoomOutcome,
};
pub use virtualization::{visible_rows, BarDraw, DrawList, DrawListBuilder, RowDraw, ScrollWindow};
