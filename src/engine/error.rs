// ==========================================
// 挤压报价系统 - 引擎层错误类型
// ==========================================
// 错误类型化, 不吞错, 不返回部分填充的成功结果
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 输入校验失败（在任何 I/O 之前返回）
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 材料/价格/报价/当前修订不存在
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("权限不足: {0}")]
    Forbidden(String),

    /// 报价号冲突重试次数耗尽
    #[error("持久化冲突: {0}")]
    PersistenceConflict(String),

    /// 旧修订已降级但新修订未写入, 报价处于无当前修订状态
    #[error("修订切换失败: quote_id={quote_id}, demoted_revision_id={demoted_revision_id}: {cause}")]
    PartialRevisionFailure {
        quote_id: String,
        demoted_revision_id: String,
        cause: String,
    },

    /// 同一报价已有重算在进行
    #[error("并发重算冲突: quote_id={0}")]
    ConcurrentRecompute(String),

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
