// ==========================================
// 生产排程甘特图 - 工序状态计算
// ==========================================
// 职责: 派生工序状态（不落库），可交给后台任务批量计算
// 优先级: 阻塞 > 已完成 > 进行中 > 当班到期 > 逾期 > 计划中
// 边界: 请求 = 工序集合 + 当前时刻 + 班次窗口；响应 = id → 状态
// ==========================================

use crate::domain::{Operation, OperationStatus, Timestamp};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// 请求队列容量
const QUEUE_CAPACITY: usize = 16;

/// 班次窗口（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ShiftWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t <= self.end
    }
}

/// 计算单个工序状态
///
/// 当班到期: 当前时刻与计划开始都落在班次窗口内。
pub fn compute_status(op: &Operation, now: Timestamp, shift: &ShiftWindow) -> OperationStatus {
    if op.is_blocked() {
        return OperationStatus::Blocked;
    }
    if op.actual_end.is_some() {
        return OperationStatus::Done;
    }
    if op.actual_start.is_some() {
        return OperationStatus::InProgress;
    }
    if shift.contains(now) && shift.contains(op.start_time) {
        return OperationStatus::DueNow;
    }
    if now > op.end_time {
        return OperationStatus::Late;
    }
    OperationStatus::Planned
}

/// 批量计算
pub fn compute_statuses(
    operations: &[Operation],
    now: Timestamp,
    shift: &ShiftWindow,
) -> HashMap<String, OperationStatus> {
    operations
        .iter()
        .map(|op| (op.id.clone(), compute_status(op, now, shift)))
        .collect()
}

/// 状态计算请求
#[derive(Debug, Clone)]
pub struct StatusRequest {
    pub operations: Vec<Operation>,
    pub now: Timestamp,
    pub shift: ShiftWindow,
}

struct StatusJob {
    request: StatusRequest,
    reply: oneshot::Sender<HashMap<String, OperationStatus>>,
}

// ==========================================
// StatusWorker - 后台状态计算任务
// ==========================================
// 生命周期: start() 启动一次 → compute() 任意次 → shutdown() 显式关闭
pub struct StatusWorker {
    sender: Option<mpsc::Sender<StatusJob>>,
    handle: Option<JoinHandle<()>>,
}

impl StatusWorker {
    /// 在当前 tokio 运行时上启动后台任务
    pub fn start() -> Self {
        let (sender, mut receiver) = mpsc::channel::<StatusJob>(QUEUE_CAPACITY);
        let handle = tokio::spawn(async move {
            tracing::info!("状态计算任务已启动");
            while let Some(job) = receiver.recv().await {
                let StatusJob { request, reply } = job;
                let count = request.operations.len();
                let statuses = compute_statuses(&request.operations, request.now, &request.shift);
                if reply.send(statuses).is_err() {
                    tracing::debug!(count, "请求方已放弃，丢弃状态计算结果");
                } else {
                    tracing::debug!(count, "状态计算完成");
                }
            }
            tracing::info!("状态计算任务已退出");
        });
        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// 提交请求并等待响应
    pub async fn compute(
        &self,
        request: StatusRequest,
    ) -> EngineResult<HashMap<String, OperationStatus>> {
        let sender = self.sender.as_ref().ok_or(EngineError::WorkerStopped)?;
        let (reply, response) = oneshot::channel();
        sender
            .send(StatusJob { request, reply })
            .await
            .map_err(|_| EngineError::WorkerStopped)?;
        response.await.map_err(|_| EngineError::WorkerDroppedRequest)
    }

    /// 关闭请求通道并等待任务退出（已排队的请求会先处理完）
    pub async fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "状态计算任务异常退出");
            }
        }
    }
}

impl Drop for StatusWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
