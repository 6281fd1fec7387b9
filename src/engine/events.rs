// ==========================================
// 生产排程甘特图 - 导入事件总线
// ==========================================
// 职责: 向订阅者广播导入进度与结果（替代进程级全局回调）
// 生命周期: 每个会话创建一次，显式传给需要通知的组件；
//           总线被丢弃后订阅者收到 Closed，随即退出
// 说明: 无订阅者时发布不是错误，事件被直接丢弃
// ==========================================

use crate::domain::{ImportProgress, ImportResult};
use crate::importer::importer_trait::ProgressSink;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// 默认缓冲容量（慢订阅者落后超过该数量时会收到 Lagged）
pub const DEFAULT_CAPACITY: usize = 256;

// ==========================================
// ImportEvent - 导入事件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImportEvent {
    /// 进度更新
    Progress(ImportProgress),
    /// 导入完成（只携带汇总，不携带工序集合）
    Completed(ImportSummary),
    /// 用户取消
    Cancelled,
    /// 运行级失败
    Failed { message: String },
}

impl ImportEvent {
    pub fn as_str(&self) -> &str {
        match self {
            ImportEvent::Progress(_) => "Progress",
            ImportEvent::Completed(_) => "Completed",
            ImportEvent::Cancelled => "Cancelled",
            ImportEvent::Failed { .. } => "Failed",
        }
    }
}

/// 导入汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    #[serde(rename = "parsedOK")]
    pub parsed_ok: usize,
    pub skipped: usize,
    pub duplicates_dropped: usize,
    pub error_count: usize,
}

impl From<&ImportResult> for ImportSummary {
    fn from(result: &ImportResult) -> Self {
        Self {
            total: result.total,
            parsed_ok: result.parsed_ok,
            skipped: result.skipped(),
            duplicates_dropped: result.duplicates_dropped,
            error_count: result.errors.len(),
        }
    }
}

// ==========================================
// ImportEventBus - 事件总线
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportEventBus {
    sender: broadcast::Sender<ImportEvent>,
}

impl Default for ImportEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ImportEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 新订阅者只收到订阅之后发布的事件
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 发布事件，返回收到事件的订阅者数
    pub fn publish(&self, event: ImportEvent) -> usize {
        let kind = event.as_str().to_string();
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!(event = %kind, "无订阅者，跳过事件");
                0
            }
        }
    }

    pub fn completed(&self, result: &ImportResult) -> usize {
        self.publish(ImportEvent::Completed(ImportSummary::from(result)))
    }

    pub fn failed(&self, message: impl Into<String>) -> usize {
        self.publish(ImportEvent::Failed {
            message: message.into(),
        })
    }

    pub fn cancelled(&self) -> usize {
        self.publish(ImportEvent::Cancelled)
    }
}

impl ProgressSink for ImportEventBus {
    fn report(&self, progress: &ImportProgress) {
        self.publish(ImportEvent::Progress(progress.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImportStage;
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = ImportEventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.cancelled(), 0);
    }

    #[tokio::test]
    async fn test_progress_reaches_every_subscriber() {
        let bus = ImportEventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.report(&ImportProgress::new(ImportStage::Validating, 5, 10));
        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                ImportEvent::Progress(p) => assert_eq!(p.processed_rows, 5),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_completed_summary_and_close() {
        let bus = ImportEventBus::new(8);
        let mut rx = bus.subscribe();
        let result = ImportResult {
            total: 3,
            parsed_ok: 2,
            duplicates_dropped: 1,
            ..Default::default()
        };
        assert_eq!(bus.completed(&result), 1);
        drop(bus);

        match rx.recv().await.unwrap() {
            ImportEvent::Completed(summary) => {
                assert_eq!(summary.parsed_ok, 2);
                assert_eq!(summary.skipped, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(ImportEvent::Failed {
            message: "bad file".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["message"], "bad file");
    }
}
