// ==========================================
// 挤压报价系统 - API层错误类型
// ==========================================
// 职责: 将 Repository / Engine 错误转换为调用方可读的错误
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("权限不足: {0}")]
    Forbidden(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("持久化冲突: {0}")]
    PersistenceConflict(String),

    #[error("并发重算冲突: quote_id={0}")]
    ConcurrentRecompute(String),

    /// 报价暂无当前修订, 需要执行对账
    #[error("修订切换失败: quote_id={quote_id}, demoted_revision_id={demoted_revision_id}: {cause}")]
    PartialRevisionFailure {
        quote_id: String,
        demoted_revision_id: String,
        cause: String,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误代码（返回给调用方）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::PersistenceConflict(_) => "PERSISTENCE_CONFLICT",
            ApiError::ConcurrentRecompute(_) => "CONCURRENT_RECOMPUTE",
            ApiError::PartialRevisionFailure { .. } => "PARTIAL_REVISION_FAILURE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 转换为错误响应
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details: match self {
                ApiError::PartialRevisionFailure {
                    quote_id,
                    demoted_revision_id,
                    ..
                } => Some(serde_json::json!({
                    "quote_id": quote_id,
                    "demoted_revision_id": demoted_revision_id,
                })),
                _ => None,
            },
        }
    }
}

/// 错误响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::CurrentRevisionChanged { quote_id, .. } => {
                ApiError::ConcurrentRecompute(quote_id)
            }
            RepositoryError::PartialTransition {
                quote_id,
                demoted_revision_id,
                cause,
            } => ApiError::PartialRevisionFailure {
                quote_id,
                demoted_revision_id,
                cause,
            },
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::PersistenceConflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::NotFound(msg) => ApiError::NotFound(msg),
            EngineError::Forbidden(msg) => ApiError::Forbidden(msg),
            EngineError::PersistenceConflict(msg) => ApiError::PersistenceConflict(msg),
            EngineError::ConcurrentRecompute(quote_id) => ApiError::ConcurrentRecompute(quote_id),
            EngineError::PartialRevisionFailure {
                quote_id,
                demoted_revision_id,
                cause,
            } => ApiError::PartialRevisionFailure {
                quote_id,
                demoted_revision_id,
                cause,
            },
            EngineError::Config(msg) => ApiError::InternalError(format!("配置读取失败: {}", msg)),
            EngineError::Serialization(e) => ApiError::InternalError(format!("序列化失败: {}", e)),
            EngineError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
