// ==========================================
// 挤压报价系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// SQLite 扩展错误码: SQLITE_CONSTRAINT_UNIQUE
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
/// SQLite 扩展错误码: SQLITE_CONSTRAINT_PRIMARYKEY
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 并发控制错误 =====
    /// 条件降级未命中（当前修订已被其他调用方取代）
    #[error("当前修订已变更: quote_id={quote_id}, revision_id={revision_id}")]
    CurrentRevisionChanged { quote_id: String, revision_id: String },

    /// 非事务两步切换: 降级成功但新修订插入失败
    #[error("修订切换中断: quote_id={quote_id}, demoted={demoted_revision_id}: {cause}")]
    PartialTransition {
        quote_id: String,
        demoted_revision_id: String,
        cause: String,
    },

    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 是否为唯一约束冲突（报价号重试只针对此类错误）
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::UniqueConstraintViolation(_))
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let text = msg.unwrap_or_else(|| code.to_string());
                if code.extended_code == SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY
                    || text.contains("UNIQUE")
                {
                    RepositoryError::UniqueConstraintViolation(text)
                } else if text.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(text)
                } else {
                    RepositoryError::DatabaseQueryError(text)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::FieldValueError {
            field: "json".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_is_detected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY, n TEXT UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO t (id, n) VALUES ('a', 'x')", []).unwrap();

        let err: RepositoryError = conn
            .execute("INSERT INTO t (id, n) VALUES ('b', 'x')", [])
            .unwrap_err()
            .into();
        assert!(err.is_unique_violation());

        let err: RepositoryError = conn
            .execute("INSERT INTO t (id, n) VALUES ('a', 'y')", [])
            .unwrap_err()
            .into();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_other_errors_are_not_unique() {
        let conn = Connection::open_in_memory().unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO missing_table VALUES (1)", [])
            .unwrap_err()
            .into();
        assert!(!err.is_unique_violation());
    }
}
