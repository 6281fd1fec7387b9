// ==========================================
// 生产排程甘特图 - 协作式取消
// ==========================================
// 职责: 取消信号（控制端 CancellationSource / 观察端 CancellationToken）
// 说明: 仅在分块边界检查，不抢占；取消后最多还会处理一个分块
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 取消控制端
///
/// 丢弃控制端不会触发取消，必须显式调用 [`cancel`](Self::cancel)。
#[derive(Debug, Default)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

/// 取消观察端（可克隆，跨线程共享）
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取与本控制端关联的令牌
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Arc::clone(&self.flag),
        }
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl CancellationToken {
    /// 永不取消的令牌
    pub fn never() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// 分块边界检查点：已取消时返回 ImportError::Cancelled
    pub fn checkpoint(&self) -> ImporterResult<()> {
        if self.is_cancelled() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_observes_source() {
        let source = CancellationSource::new();
        let token = source.token();
        let cloned = token.clone();
        assert!(token.checkpoint().is_ok());

        source.cancel();
        assert!(token.is_cancelled());
        assert!(cloned.is_cancelled());
        assert!(token.checkpoint().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_dropping_source_does_not_cancel() {
        let token = {
            let source = CancellationSource::new();
            source.token()
        };
        assert!(!token.is_cancelled());
        assert!(!CancellationToken::never().is_cancelled());
    }
}
