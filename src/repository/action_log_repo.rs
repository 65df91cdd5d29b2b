// ==========================================
// 挤压报价系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
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

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, quote_id, action_type, action_ts, actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.action_id,
                log.quote_id,
                log.action_type,
                log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    /// 按报价查询日志（时间正序）
    pub fn find_by_quote(&self, quote_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        self.query(
            r#"
            SELECT action_id, quote_id, action_type, action_ts, actor, payload_json, detail
            FROM action_log
            WHERE quote_id = ?1
            ORDER BY action_ts ASC, rowid ASC
            "#,
            Some(quote_id),
        )
    }

    /// 按操作类型查询日志（时间正序）
    pub fn find_by_action_type(&self, action_type: &str) -> RepositoryResult<Vec<ActionLog>> {
        self.query(
            r#"
            SELECT action_id, quote_id, action_type, action_ts, actor, payload_json, detail
            FROM action_log
            WHERE action_type = ?1
            ORDER BY action_ts ASC, rowid ASC
            "#,
            Some(action_type),
        )
    }

    fn query(&self, sql: &str, arg: Option<&str>) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let logs = stmt
            .query_map(params![arg], |row| {
                let payload: Option<String> = row.get(5)?;
                Ok(ActionLog {
                    action_id: row.get(0)?,
                    quote_id: row.get(1)?,
                    action_type: row.get(2)?,
                    action_ts: row.get(3)?,
                    actor: row.get(4)?,
                    payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
                    detail: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use serde_json::json;

    fn setup_repo() -> ActionLogRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ActionLogRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_insert_and_find_by_quote() {
        let repo = setup_repo();

        let log = ActionLog::new(
            ActionType::CreateQuote,
            Some("q1".to_string()),
            "user1",
            Some(json!({"quote_number": "Q-1"})),
            None,
        );
        let id = repo.insert(&log).unwrap();
        assert_eq!(id, log.action_id);

        let logs = repo.find_by_quote("q1").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action_type, "CREATE_QUOTE");
        assert_eq!(logs[0].payload_json, Some(json!({"quote_number": "Q-1"})));
    }

    #[test]
    fn test_find_by_action_type_without_quote() {
        let repo = setup_repo();
        repo.insert(&ActionLog::new(
            ActionType::UpdateDieSettings,
            None,
            "admin",
            None,
            Some("a0=0.25".to_string()),
        ))
        .unwrap();

        let logs = repo.find_by_action_type("UPDATE_DIE_SETTINGS").unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].quote_id.is_none());
        assert!(repo.find_by_quote("q1").unwrap().is_empty());
    }
}
