// ==========================================
// 生产排程甘特图 - 导入层 Trait
// ==========================================
// 职责: 定义导入管道的协作者接口（不包含实现）
// ==========================================

use crate::domain::{ImportProgress, MappingProfile};
use crate::importer::cancellation::CancellationToken;
use crate::importer::error::ImporterResult;
use crate::importer::file_parser::ParsedData;
use async_trait::async_trait;

// ==========================================
// ProgressSink Trait
// ==========================================
// 用途: 进度回调（解析阶段与处理阶段共用）
// 实现者: 闭包 Fn(&ImportProgress)、ImportEventBus、NoProgress
pub trait ProgressSink: Send + Sync {
    /// 报告进度（processed_rows 单调不减）
    fn report(&self, progress: &ImportProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&ImportProgress) + Send + Sync,
{
    fn report(&self, progress: &ImportProgress) {
        self(progress)
    }
}

/// 丢弃所有进度
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &ImportProgress) {}
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 字节流 → 表头 + 行（阶段 0）
// 实现者: CsvParser, WorkbookParser
#[async_trait]
pub trait FileParser: Send + Sync {
    /// 解析完整字节流
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - progress: 进度回调（每个分块一次）
    /// - cancel: 取消令牌（每个分块边界检查，检查后让出运行时）
    ///
    /// # 返回
    /// - Ok(ParsedData): 表头与数据行
    /// - Err(Cancelled): 用户取消
    /// - Err: 文件损坏、工作表不存在等运行级错误
    async fn parse_bytes(
        &self,
        bytes: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ImporterResult<ParsedData>;
}

// ==========================================
// ProfileStore Trait
// ==========================================
// 用途: 映射方案持久化（外部协作者）
// 实现者: InMemoryProfileStore（测试/CLI），宿主应用自行实现持久化版本
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// 按表头指纹查找方案
    async fn find_by_header_hash(&self, header_hash: &str)
        -> ImporterResult<Option<MappingProfile>>;

    /// 默认方案
    async fn default_profile(&self) -> ImporterResult<Option<MappingProfile>>;

    /// 全部方案（按创建顺序）
    async fn list(&self) -> ImporterResult<Vec<MappingProfile>>;

    /// 新增或按 id 覆盖
    async fn save(&self, profile: MappingProfile) -> ImporterResult<()>;

    /// 设为默认（其余方案取消默认）
    async fn set_default(&self, id: &str) -> ImporterResult<bool>;

    /// 删除方案，返回是否存在
    async fn delete(&self, id: &str) -> ImporterResult<bool>;
}
