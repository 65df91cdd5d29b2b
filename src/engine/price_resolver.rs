// ==========================================
// 挤压报价系统 - 材料价格解析
// ==========================================
// "截至D日的有效价格" = effective_date <= D 中最新的一行
// 纯读取, 不缓存
// ==========================================

use crate::domain::material::MaterialPrice;
use crate::domain::quote::MaterialContext;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::MaterialStore;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

pub struct MaterialPriceResolver {
    store: Arc<dyn MaterialStore>,
}

impl MaterialPriceResolver {
    pub fn new(store: Arc<dyn MaterialStore>) -> Self {
        Self { store }
    }

    /// 解析截至 as_of 的有效价格
    pub async fn resolve(&self, material_id: &str, as_of: NaiveDate) -> EngineResult<MaterialPrice> {
        let price = self
            .store
            .find_effective_price(material_id, as_of)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "材料 {} 在 {} 之前没有已生效价格",
                    material_id, as_of
                ))
            })?;

        debug!(
            material_id = %material_id,
            as_of = %as_of,
            price_id = %price.price_id,
            effective_date = %price.effective_date,
            "材料价格已解析"
        );
        Ok(price)
    }

    /// 解析材料主数据 + 有效价格, 生成计算上下文
    pub async fn resolve_context(
        &self,
        material_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<MaterialContext> {
        let material = self
            .store
            .find_material(material_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("材料 {} 不存在", material_id)))?;

        let price = self.resolve(material_id, as_of).await?;

        Ok(MaterialContext {
            density_lb_in3: material.density_lb_in3,
            material_family: material.family,
            material_grade: material.grade,
            price_per_lb: price.price_per_lb,
            price_effective_date: price.effective_date,
        })
    }
}
