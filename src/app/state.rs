// ==========================================
// 挤压报价系统 - 应用状态
// ==========================================
// 职责: 组装 Repository / Engine / API, 所有组件共享一条连接
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{DieEstimatorApi, MaterialPriceApi, QuoteApi};
use crate::config::{ConfigManager, PricingConfigReader};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::engine::RevisionOrchestrator;
use crate::repository::{
    ActionLogRepository, DieSettingsRepository, MaterialRepository, MaterialStore,
    QuoteRepository, QuoteStore,
};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 建表后的 schema 版本
    pub schema_version: Option<i64>,

    pub quote_api: Arc<QuoteApi>,
    pub die_estimator_api: Arc<DieEstimatorApi>,
    pub material_price_api: Arc<MaterialPriceApi>,

    /// 配置管理器（定价倍率、阶梯参数）
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 组装编排器与API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let schema_version =
            read_schema_version(&conn).map_err(|e| format!("读取schema版本失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let material_repo: Arc<dyn MaterialStore> =
            Arc::new(MaterialRepository::from_connection(conn.clone()));
        let quote_repo: Arc<dyn QuoteStore> =
            Arc::new(QuoteRepository::from_connection(conn.clone()));
        let die_settings_repo = Arc::new(DieSettingsRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::from_connection(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let orchestrator = Arc::new(RevisionOrchestrator::new(
            material_repo.clone(),
            quote_repo.clone(),
            config_manager.clone() as Arc<dyn PricingConfigReader>,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let quote_api = Arc::new(QuoteApi::new(
            orchestrator,
            quote_repo,
            action_log_repo.clone(),
        ));
        let die_estimator_api = Arc::new(DieEstimatorApi::new(
            die_settings_repo,
            action_log_repo.clone(),
        ));
        let material_price_api = Arc::new(MaterialPriceApi::new(
            material_repo,
            action_log_repo.clone(),
        ));

        tracing::info!(schema_version = ?schema_version, "AppState初始化完成");

        Ok(Self {
            db_path,
            schema_version,
            quote_api,
            die_estimator_api,
            material_price_api,
            config_manager,
            action_log_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: QUOTE_ENGINE_DB 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("QUOTE_ENGINE_DB") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(format!("./{}", crate::DB_FILE_NAME));

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("extrusion-quote-engine");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join(crate::DB_FILE_NAME);
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_initializes_schema() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert_eq!(state.schema_version, Some(crate::db::CURRENT_SCHEMA_VERSION));

        // 重复初始化幂等
        let again = AppState::new(db_path).unwrap();
        assert_eq!(again.schema_version, state.schema_version);
    }
}
