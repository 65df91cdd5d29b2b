// ==========================================
// 挤压报价系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 每次调用都从数据库读取, 不做缓存
// ==========================================

use crate::config::pricing_config_trait::PricingConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::quote::EauMoqConfig;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 默认价格倍率（天花板价 = 材料成本 × 倍率）
pub const DEFAULT_PRICING_MULTIPLIER: f64 = 2.5;

/// 默认报价号生成尝试次数
pub const DEFAULT_QUOTE_NUMBER_MAX_ATTEMPTS: u32 = 3;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const PRICING_MULTIPLIER: &str = "pricing.multiplier";
    pub const EAU_MOQ_K: &str = "eau_moq.k";
    pub const EAU_MOQ_F_MIN: &str = "eau_moq.f_min";
    pub const EAU_MOQ_GP_MIN_ORDER: &str = "eau_moq.gp_min_order";
    pub const EAU_MOQ_SETUP_CHARGE: &str = "eau_moq.setup_charge";
    pub const EAU_MOQ_MOQ_FLOOR: &str = "eau_moq.moq_floor";
    pub const QUOTE_NUMBER_MAX_ATTEMPTS: &str = "quote.number_max_attempts";
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
}

impl ConfigScope {
    pub fn scope_id(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![ConfigScope::Global.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![ConfigScope::Global.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值
    ///
    /// 缺失 → 默认值; 无法解析或不满足 valid → warn 日志 + 默认值
    fn get_parsed_or_default<T>(
        &self,
        key: &str,
        default: T,
        valid: impl Fn(&T) -> bool,
    ) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) if valid(&v) => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    "配置值格式错误或越界，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 审计日志中记录计算时的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 定价配置 =====

    /// 价格倍率（必须 > 0，默认 2.5）
    pub fn pricing_multiplier(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::PRICING_MULTIPLIER,
            DEFAULT_PRICING_MULTIPLIER,
            |v: &f64| v.is_finite() && *v > 0.0,
        )
    }

    /// 阶梯折扣与 MOQ 参数
    ///
    /// 各项单独回退默认值; 组合后的整体校验由 MoqTableBuilder 负责
    pub fn eau_moq_config(&self) -> Result<EauMoqConfig, Box<dyn Error>> {
        let d = EauMoqConfig::default();
        let finite = |v: &f64| v.is_finite();

        Ok(EauMoqConfig {
            k: self.get_parsed_or_default(config_keys::EAU_MOQ_K, d.k, finite)?,
            f_min: self.get_parsed_or_default(config_keys::EAU_MOQ_F_MIN, d.f_min, finite)?,
            gp_min_order: self.get_parsed_or_default(
                config_keys::EAU_MOQ_GP_MIN_ORDER,
                d.gp_min_order,
                finite,
            )?,
            setup_charge: self.get_parsed_or_default(
                config_keys::EAU_MOQ_SETUP_CHARGE,
                d.setup_charge,
                finite,
            )?,
            moq_floor: self.get_parsed_or_default(
                config_keys::EAU_MOQ_MOQ_FLOOR,
                d.moq_floor,
                |_| true,
            )?,
        })
    }

    // ===== 报价号配置 =====

    /// 报价号生成尝试次数（>= 1，默认 3）
    pub fn quote_number_max_attempts(&self) -> Result<u32, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::QUOTE_NUMBER_MAX_ATTEMPTS,
            DEFAULT_QUOTE_NUMBER_MAX_ATTEMPTS,
            |v: &u32| *v >= 1,
        )
    }
}

// ==========================================
// PricingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PricingConfigReader for ConfigManager {
    async fn get_pricing_multiplier(&self) -> Result<f64, Box<dyn Error>> {
        self.pricing_multiplier()
    }

    async fn get_eau_moq_config(&self) -> Result<EauMoqConfig, Box<dyn Error>> {
        self.eau_moq_config()
    }

    async fn get_quote_number_max_attempts(&self) -> Result<u32, Box<dyn Error>> {
        self.quote_number_max_attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = setup_manager();
        assert_eq!(config.pricing_multiplier().unwrap(), 2.5);
        assert_eq!(config.eau_moq_config().unwrap(), EauMoqConfig::default());
        assert_eq!(config.quote_number_max_attempts().unwrap(), 3);
    }

    #[test]
    fn test_overrides_are_read_fresh() {
        let config = setup_manager();
        config
            .set_global_config_value(config_keys::PRICING_MULTIPLIER, "3.0")
            .unwrap();
        assert_eq!(config.pricing_multiplier().unwrap(), 3.0);

        config
            .set_global_config_value(config_keys::PRICING_MULTIPLIER, "2.75")
            .unwrap();
        assert_eq!(config.pricing_multiplier().unwrap(), 2.75);

        config
            .set_global_config_value(config_keys::EAU_MOQ_MOQ_FLOOR, "750")
            .unwrap();
        assert_eq!(config.eau_moq_config().unwrap().moq_floor, 750);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let config = setup_manager();
        config
            .set_global_config_value(config_keys::PRICING_MULTIPLIER, "abc")
            .unwrap();
        assert_eq!(config.pricing_multiplier().unwrap(), 2.5);

        config
            .set_global_config_value(config_keys::PRICING_MULTIPLIER, "-1")
            .unwrap();
        assert_eq!(config.pricing_multiplier().unwrap(), 2.5);

        config
            .set_global_config_value(config_keys::QUOTE_NUMBER_MAX_ATTEMPTS, "0")
            .unwrap();
        assert_eq!(config.quote_number_max_attempts().unwrap(), 3);
    }

    #[test]
    fn test_config_snapshot_contains_keys() {
        let config = setup_manager();
        config.set_global_config_value(config_keys::EAU_MOQ_K, "0.1").unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["eau_moq.k"], "0.1");
    }
}
