// ==========================================
// 挤压报价系统 - 材料与材料价格数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 价格只追加, 同一生效日期以最后插入的一行为准
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::material::{Material, MaterialPrice};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MaterialStore Trait
// ==========================================
// 用途: 报价引擎读取材料主数据与有效价格
// 实现者: MaterialRepository（使用 rusqlite）
#[async_trait]
pub trait MaterialStore: Send + Sync {
    /// 按ID查询材料
    async fn find_material(&self, material_id: &str) -> RepositoryResult<Option<Material>>;

    /// 查询截至 as_of 的有效价格
    ///
    /// # 返回
    /// - Some: effective_date <= as_of 中最新的一行（同日取最后插入）
    /// - None: 无已生效价格
    async fn find_effective_price(
        &self,
        material_id: &str,
        as_of: NaiveDate,
    ) -> RepositoryResult<Option<MaterialPrice>>;

    /// 插入材料主数据
    async fn insert_material(&self, material: &Material) -> RepositoryResult<()>;

    /// 追加一条价格记录
    async fn insert_price(&self, price: &MaterialPrice) -> RepositoryResult<()>;

    /// 价格历史（生效日期倒序）
    async fn list_prices(&self, material_id: &str) -> RepositoryResult<Vec<MaterialPrice>>;
}

// ==========================================
// MaterialRepository - SQLite 实现
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    /// 创建新的 MaterialRepository 实例
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

    fn map_material(row: &Row) -> rusqlite::Result<Material> {
        Ok(Material {
            material_id: row.get(0)?,
            density_lb_in3: row.get(1)?,
            family: row.get(2)?,
            grade: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn map_price(row: &Row) -> rusqlite::Result<MaterialPrice> {
        Ok(MaterialPrice {
            price_id: row.get(0)?,
            material_id: row.get(1)?,
            price_per_lb: row.get(2)?,
            effective_date: row.get(3)?,
            source: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[async_trait]
impl MaterialStore for MaterialRepository {
    async fn find_material(&self, material_id: &str) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        let material = conn
            .query_row(
                r#"
                SELECT material_id, density_lb_in3, family, grade, created_at
                FROM materials
                WHERE material_id = ?1
                "#,
                params![material_id],
                Self::map_material,
            )
            .optional()?;
        Ok(material)
    }

    async fn find_effective_price(
        &self,
        material_id: &str,
        as_of: NaiveDate,
    ) -> RepositoryResult<Option<MaterialPrice>> {
        let conn = self.get_conn()?;
        // rowid 单调递增, 作为同日多条价格的插入顺序
        let price = conn
            .query_row(
                r#"
                SELECT price_id, material_id, price_per_lb, effective_date, source, created_at
                FROM material_prices
                WHERE material_id = ?1 AND effective_date <= ?2
                ORDER BY effective_date DESC, rowid DESC
                LIMIT 1
                "#,
                params![material_id, as_of.format("%Y-%m-%d").to_string()],
                Self::map_price,
            )
            .optional()?;
        Ok(price.filter(|p| p.is_effective_on(as_of)))
    }

    async fn insert_material(&self, material: &Material) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO materials (material_id, density_lb_in3, family, grade, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                material.material_id,
                material.density_lb_in3,
                material.family,
                material.grade,
                material.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    async fn insert_price(&self, price: &MaterialPrice) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO material_prices (
                price_id, material_id, price_per_lb, effective_date, source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                price.price_id,
                price.material_id,
                price.price_per_lb,
                price.effective_date.format("%Y-%m-%d").to_string(),
                price.source,
                price.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    async fn list_prices(&self, material_id: &str) -> RepositoryResult<Vec<MaterialPrice>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT price_id, material_id, price_per_lb, effective_date, source, created_at
            FROM material_prices
            WHERE material_id = ?1
            ORDER BY effective_date DESC, rowid DESC
            "#,
        )?;
        let prices = stmt
            .query_map(params![material_id], Self::map_price)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }
}
