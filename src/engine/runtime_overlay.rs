// ==========================================
// 生产排程甘特图 - 运行态覆盖
// ==========================================
// 职责: 操作员录入的实际开始/实际结束/阻塞标记，渲染时合并到工序上
// 键: 订单号||工序号||资源||开始时刻(ISO, UTC, 毫秒)
// 说明: 存储由外部协作者实现，本模块只定义读写契约与内存实现
// ==========================================

use crate::domain::{BlockedFlag, Operation, Timestamp};
use crate::engine::error::EngineResult;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 覆盖数据的复合键
pub fn runtime_key(op: &Operation) -> String {
    format!(
        "{}||{}||{}||{}",
        op.order_no,
        op.op_no.as_deref().unwrap_or(""),
        op.resource,
        op.start_time
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// 单个工序的运行态覆盖（None 表示不覆盖）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeOverlay {
    pub actual_start: Option<Timestamp>,
    pub actual_end: Option<Timestamp>,
    pub blocked: Option<BlockedFlag>,
}

impl RuntimeOverlay {
    pub fn is_empty(&self) -> bool {
        self.actual_start.is_none() && self.actual_end.is_none() && self.blocked.is_none()
    }

    fn apply_to(&self, op: &mut Operation) {
        if let Some(start) = self.actual_start {
            op.actual_start = Some(start);
        }
        if let Some(end) = self.actual_end {
            op.actual_end = Some(end);
        }
        if let Some(blocked) = &self.blocked {
            op.blocked = Some(blocked.clone());
        }
    }
}

pub type RuntimeOverlayMap = HashMap<String, RuntimeOverlay>;

/// 合并覆盖数据，返回新的工序副本（输入不变）
pub fn merge_runtime(operations: &[Operation], overlays: &RuntimeOverlayMap) -> Vec<Operation> {
    if overlays.is_empty() {
        return operations.to_vec();
    }
    let mut merged_count = 0usize;
    let merged = operations
        .iter()
        .map(|op| {
            let mut copy = op.clone();
            if let Some(overlay) = overlays.get(&runtime_key(op)) {
                overlay.apply_to(&mut copy);
                merged_count += 1;
            }
            copy
        })
        .collect();
    tracing::debug!(
        operations = operations.len(),
        overlays = overlays.len(),
        merged = merged_count,
        "运行态覆盖已合并"
    );
    merged
}

// ==========================================
// RuntimeOverlayStore Trait
// ==========================================
// 用途: 运行态覆盖的加载/保存
// 实现者: InMemoryRuntimeOverlayStore（外部持久化由宿主实现）
#[async_trait]
pub trait RuntimeOverlayStore: Send + Sync {
    /// 加载全部覆盖
    async fn load(&self) -> EngineResult<RuntimeOverlayMap>;

    /// 整体替换
    async fn save(&self, overlays: RuntimeOverlayMap) -> EngineResult<()>;

    /// 写入单个工序的覆盖（空覆盖即删除）
    async fn upsert(&self, key: String, overlay: RuntimeOverlay) -> EngineResult<()>;
}

/// 内存实现
#[derive(Debug, Default)]
pub struct InMemoryRuntimeOverlayStore {
    overlays: RwLock<RuntimeOverlayMap>,
}

impl InMemoryRuntimeOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuntimeOverlayStore for InMemoryRuntimeOverlayStore {
    async fn load(&self) -> EngineResult<RuntimeOverlayMap> {
        Ok(self.overlays.read().await.clone())
    }

    async fn save(&self, overlays: RuntimeOverlayMap) -> EngineResult<()> {
        *self.overlays.write().await = overlays;
        Ok(())
    }

    async fn upsert(&self, key: String, overlay: RuntimeOverlay) -> EngineResult<()> {
        let mut guard = self.overlays.write().await;
        if overlay.is_empty() {
            guard.remove(&key);
        } else {
            guard.insert(key, overlay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_runtime_key_format() {
        let mut op = Operation::new("ZL-1", "M1", at(6, 28), at(7, 0));
        assert_eq!(runtime_key(&op), "ZL-1||||M1||2025-01-10T06:28:00.000Z");
        op.op_no = Some("20".to_string());
        assert_eq!(runtime_key(&op), "ZL-1||20||M1||2025-01-10T06:28:00.000Z");
    }

    #[test]
    fn test_merge_returns_copies() {
        let ops = vec![
            Operation::new("ZL-1", "M1", at(6, 0), at(7, 0)),
            Operation::new("ZL-2", "M1", at(8, 0), at(9, 0)),
        ];
        let mut overlays = RuntimeOverlayMap::new();
        overlays.insert(
            runtime_key(&ops[0]),
            RuntimeOverlay {
                actual_start: Some(at(6, 5)),
                ..Default::default()
            },
        );

        let merged = merge_runtime(&ops, &overlays);
        assert_eq!(merged[0].actual_start, Some(at(6, 5)));
        assert_eq!(merged[1].actual_start, None);
        assert_eq!(ops[0].actual_start, None);
        assert_eq!(merged[0].id, ops[0].id);
    }

    #[test]
    fn test_overlay_json_shape() {
        let overlay: RuntimeOverlay = serde_json::from_str(
            r#"{"actualEnd":"2025-01-10T09:00:00","blocked":{"flag":true,"note":"brak materiału"}}"#,
        )
        .unwrap();
        assert_eq!(overlay.actual_end, Some(at(9, 0)));
        assert!(overlay.blocked.unwrap().flag);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryRuntimeOverlayStore::new();
        let overlay = RuntimeOverlay {
            blocked: Some(BlockedFlag {
                flag: true,
                note: None,
            }),
            ..Default::default()
        };
        store.upsert("k".to_string(), overlay.clone()).await.unwrap();
        assert_eq!(store.load().await.unwrap().get("k"), Some(&overlay));

        store
            .upsert("k".to_string(), RuntimeOverlay::default())
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_empty());

        let mut all = RuntimeOverlayMap::new();
        all.insert("a".to_string(), overlay);
        store.save(all).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }
}
