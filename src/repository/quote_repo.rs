// ==========================================
// 挤压报价系统 - 报价与修订数据仓储
// ==========================================
// 红线: 修订只追加, 仅 is_current 标志可被切换
// 红线: 降级必须带条件 (is_current = 1), 未命中即视为并发冲突
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::quote::{Quote, QuoteRevision};
use crate::domain::types::QuoteStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// QuoteStore Trait
// ==========================================
// 用途: 报价头与修订的持久化
// 实现者: QuoteRepository（使用 rusqlite）
#[async_trait]
pub trait QuoteStore: Send + Sync {
    // ===== 报价头 =====

    /// 插入报价头（quote_number 冲突返回 UniqueConstraintViolation）
    async fn insert_quote(&self, quote: &Quote) -> RepositoryResult<()>;

    async fn find_quote(&self, quote_id: &str) -> RepositoryResult<Option<Quote>>;

    /// 删除报价及其全部修订
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 报价不存在
    async fn delete_quote(&self, quote_id: &str) -> RepositoryResult<bool>;

    // ===== 修订 =====

    async fn insert_revision(&self, revision: &QuoteRevision) -> RepositoryResult<()>;

    async fn find_current_revision(&self, quote_id: &str)
        -> RepositoryResult<Option<QuoteRevision>>;

    /// 全部修订（按修订号升序）
    async fn list_revisions(&self, quote_id: &str) -> RepositoryResult<Vec<QuoteRevision>>;

    /// 条件降级当前修订
    ///
    /// 仅当 revision_id 仍为当前修订时生效, 否则返回 CurrentRevisionChanged
    async fn demote_current(&self, quote_id: &str, revision_id: &str) -> RepositoryResult<()>;

    /// 将指定修订提升为当前修订
    async fn promote_revision(&self, revision_id: &str) -> RepositoryResult<()>;

    /// 查询没有当前修订、但至少有一条修订的报价
    async fn find_quotes_without_current(&self) -> RepositoryResult<Vec<String>>;

    /// 以 next 取代 current 成为当前修订
    ///
    /// 默认实现为两步（先降级再插入）, 适用于不支持多行事务的存储。
    /// 降级成功而插入失败时返回 PartialTransition, 由对账流程修复。
    async fn supersede_current(
        &self,
        current: &QuoteRevision,
        next: &QuoteRevision,
    ) -> RepositoryResult<()> {
        self.demote_current(&current.quote_id, &current.revision_id)
            .await?;

        if let Err(e) = self.insert_revision(next).await {
            return Err(RepositoryError::PartialTransition {
                quote_id: current.quote_id.clone(),
                demoted_revision_id: current.revision_id.clone(),
                cause: e.to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// QuoteRepository - SQLite 实现
// ==========================================
pub struct QuoteRepository {
    conn: Arc<Mutex<Connection>>,
}

const REVISION_COLUMNS: &str = "revision_id, quote_id, revision_number, is_current, \
     inputs_json, outputs_json, material_price_used, multiplier_used, created_by, created_at";

impl QuoteRepository {
    /// 创建新的 QuoteRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_quote(row: &Row) -> rusqlite::Result<Quote> {
        let status: String = row.get(3)?;
        Ok(Quote {
            quote_id: row.get(0)?,
            quote_number: row.get(1)?,
            customer_id: row.get(2)?,
            status: QuoteStatus::from_str(&status),
            created_by: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn map_revision(row: &Row) -> rusqlite::Result<QuoteRevision> {
        let inputs: String = row.get(4)?;
        let outputs: String = row.get(5)?;
        Ok(QuoteRevision {
            revision_id: row.get(0)?,
            quote_id: row.get(1)?,
            revision_number: row.get(2)?,
            is_current: row.get::<_, i64>(3)? != 0,
            inputs_json: parse_json_column(4, &inputs)?,
            outputs_json: parse_json_column(5, &outputs)?,
            material_price_used: row.get(6)?,
            multiplier_used: row.get(7)?,
            created_by: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn insert_revision_with(conn: &Connection, revision: &QuoteRevision) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO quote_revisions (
                revision_id, quote_id, revision_number, is_current,
                inputs_json, outputs_json, material_price_used, multiplier_used,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                revision.revision_id,
                revision.quote_id,
                revision.revision_number,
                revision.is_current as i64,
                revision.inputs_json.to_string(),
                revision.outputs_json.to_string(),
                revision.material_price_used,
                revision.multiplier_used,
                revision.created_by,
                revision.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    fn demote_with(conn: &Connection, quote_id: &str, revision_id: &str) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"
            UPDATE quote_revisions
            SET is_current = 0
            WHERE revision_id = ?1 AND quote_id = ?2 AND is_current = 1
            "#,
            params![revision_id, quote_id],
        )?;

        if rows != 1 {
            return Err(RepositoryError::CurrentRevisionChanged {
                quote_id: quote_id.to_string(),
                revision_id: revision_id.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_json_column(idx: usize, raw: &str) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[async_trait]
impl QuoteStore for QuoteRepository {
    async fn insert_quote(&self, quote: &Quote) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO quotes (quote_id, quote_number, customer_id, status, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                quote.quote_id,
                quote.quote_number,
                quote.customer_id,
                quote.status.to_db_str(),
                quote.created_by,
                quote.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    async fn find_quote(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
        let conn = self.get_conn()?;
        let quote = conn
            .query_row(
                r#"
                SELECT quote_id, quote_number, customer_id, status, created_by, created_at
                FROM quotes
                WHERE quote_id = ?1
                "#,
                params![quote_id],
                Self::map_quote,
            )
            .optional()?;
        Ok(quote)
    }

    async fn delete_quote(&self, quote_id: &str) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM quote_revisions WHERE quote_id = ?1",
            params![quote_id],
        )?;
        let rows = tx.execute("DELETE FROM quotes WHERE quote_id = ?1", params![quote_id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    async fn insert_revision(&self, revision: &QuoteRevision) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_revision_with(&conn, revision)
    }

    async fn find_current_revision(
        &self,
        quote_id: &str,
    ) -> RepositoryResult<Option<QuoteRevision>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM quote_revisions WHERE quote_id = ?1 AND is_current = 1",
            REVISION_COLUMNS
        );
        let revision = conn
            .query_row(&sql, params![quote_id], Self::map_revision)
            .optional()?;
        Ok(revision)
    }

    async fn list_revisions(&self, quote_id: &str) -> RepositoryResult<Vec<QuoteRevision>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM quote_revisions WHERE quote_id = ?1 ORDER BY revision_number ASC",
            REVISION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let revisions = stmt
            .query_map(params![quote_id], Self::map_revision)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(revisions)
    }

    async fn demote_current(&self, quote_id: &str, revision_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::demote_with(&conn, quote_id, revision_id)
    }

    async fn promote_revision(&self, revision_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE quote_revisions SET is_current = 1 WHERE revision_id = ?1",
            params![revision_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "QuoteRevision".to_string(),
                id: revision_id.to_string(),
            });
        }
        Ok(())
    }

    async fn find_quotes_without_current(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT quote_id
            FROM quote_revisions
            GROUP BY quote_id
            HAVING SUM(is_current) = 0
            ORDER BY quote_id
            "#,
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// 单事务切换: 条件降级 + 插入, 任一步失败整体回滚
    async fn supersede_current(
        &self,
        current: &QuoteRevision,
        next: &QuoteRevision,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        Self::demote_with(&tx, &current.quote_id, &current.revision_id)?;
        Self::insert_revision_with(&tx, next)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }
}
