// ==========================================
// 挤压报价系统 - 模具估算参数数据仓储
// ==========================================
// 每次修改追加一行, 最新一行生效; 表为空时返回默认参数
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::die::{DieEstimatorSettings, DieSettingsRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct DieSettingsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DieSettingsRepository {
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

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取最新参数行（不存在返回 None）
    pub fn find_latest(&self) -> RepositoryResult<Option<DieSettingsRecord>> {
        let conn = self.get_conn()?;
        let record = conn
            .query_row(
                r#"
                SELECT settings_id, a0, k, cavity_slope, low_band, high_band,
                       base_solid, base_hollow, base_coex, updated_by, updated_at
                FROM die_estimator_settings
                ORDER BY rowid DESC
                LIMIT 1
                "#,
                [],
                |row| {
                    Ok(DieSettingsRecord {
                        settings_id: row.get(0)?,
                        settings: DieEstimatorSettings {
                            a0: row.get(1)?,
                            k: row.get(2)?,
                            cavity_slope: row.get(3)?,
                            low_band: row.get(4)?,
                            high_band: row.get(5)?,
                            base_solid: row.get(6)?,
                            base_hollow: row.get(7)?,
                            base_coex: row.get(8)?,
                        },
                        updated_by: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// 当前生效参数（表为空时为默认值）
    pub fn current_settings(&self) -> RepositoryResult<DieEstimatorSettings> {
        Ok(self
            .find_latest()?
            .map(|r| r.settings)
            .unwrap_or_default())
    }

    /// 追加一行参数
    pub fn insert(&self, record: &DieSettingsRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let s = &record.settings;
        conn.execute(
            r#"
            INSERT INTO die_estimator_settings (
                settings_id, a0, k, cavity_slope, low_band, high_band,
                base_solid, base_hollow, base_coex, updated_by, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.settings_id,
                s.a0,
                s.k,
                s.cavity_slope,
                s.low_band,
                s.high_band,
                s.base_solid,
                s.base_hollow,
                s.base_coex,
                record.updated_by,
                record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_repo() -> DieSettingsRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        DieSettingsRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_empty() {
        let repo = setup_repo();
        assert!(repo.find_latest().unwrap().is_none());
        assert_eq!(repo.current_settings().unwrap(), DieEstimatorSettings::default());
    }

    #[test]
    fn test_latest_row_wins() {
        let repo = setup_repo();
        let at = NaiveDate::from_ymd_opt(2026, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        for (id, base_solid) in [("s1", 7000.0), ("s2", 7500.0)] {
            repo.insert(&DieSettingsRecord {
                settings_id: id.to_string(),
                settings: DieEstimatorSettings {
                    base_solid,
                    ..DieEstimatorSettings::default()
                },
                updated_by: Some("admin".to_string()),
                updated_at: at,
            })
            .unwrap();
        }

        let latest = repo.find_latest().unwrap().unwrap();
        assert_eq!(latest.settings_id, "s2");
        assert_eq!(repo.current_settings().unwrap().base_solid, 7500.0);
    }
}
