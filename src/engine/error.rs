// ==========================================
// 生产排程甘特图 - 引擎层错误类型
// ==========================================
// 职责: 后台状态计算与运行态覆盖存储的错误
// 说明: 视口/泳道/布局均为纯函数，不产生错误
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("status worker is not running")]
    WorkerStopped,

    #[error("status worker dropped the request")]
    WorkerDroppedRequest,

    #[error("runtime overlay store error: {0}")]
    OverlayStore(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
