// ==========================================
// 挤压报价系统 - 材料价格 API
// ==========================================
// 职责: 新增材料、追加材料价格、查询价格历史
// 红线: 价格只追加不修改
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::material::{Material, MaterialPrice};
use crate::domain::types::Caller;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::MaterialStore;

/// 追加价格请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMaterialPriceRequest {
    pub material_id: String,
    pub price_per_lb: f64,
    /// YYYY-MM-DD
    pub effective_date: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// 新增材料请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMaterialRequest {
    pub material_id: String,
    pub density_lb_in3: f64,
    pub family: String,
    pub grade: String,
}

/// 解析日期字符串
fn parse_date(date_str: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidInput(format!("日期格式错误（应为YYYY-MM-DD）: {}", e)))
}

pub struct MaterialPriceApi {
    material_store: Arc<dyn MaterialStore>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl MaterialPriceApi {
    pub fn new(
        material_store: Arc<dyn MaterialStore>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            material_store,
            action_log_repo,
        }
    }

    fn ensure_admin(caller: &Caller) -> ApiResult<()> {
        if caller.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "角色 {} 不允许维护材料数据",
                caller.role
            )))
        }
    }

    fn record_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(action_type = %log.action_type, error = %e, "操作日志写入失败");
        }
    }

    /// 新增材料（仅管理员, 材料ID重复返回 PersistenceConflict）
    pub async fn add_material(
        &self,
        caller: &Caller,
        request: AddMaterialRequest,
    ) -> ApiResult<Material> {
        Self::ensure_admin(caller)?;

        let material_id = request.material_id.trim().to_string();
        if material_id.is_empty() {
            return Err(ApiError::InvalidInput("material_id 不能为空".to_string()));
        }
        if !request.density_lb_in3.is_finite() || request.density_lb_in3 <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "density_lb_in3 必须为正数, 实际为 {}",
                request.density_lb_in3
            )));
        }
        let family = request.family.trim().to_string();
        let grade = request.grade.trim().to_string();
        if family.is_empty() || grade.is_empty() {
            return Err(ApiError::InvalidInput("family 与 grade 不能为空".to_string()));
        }

        let material = Material {
            material_id,
            density_lb_in3: request.density_lb_in3,
            family,
            grade,
            created_at: chrono::Local::now().naive_local(),
        };
        self.material_store.insert_material(&material).await?;

        info!(material_id = %material.material_id, "材料已新增");
        self.record_action(ActionLog::new(
            ActionType::AddMaterial,
            None,
            &caller.user_id,
            Some(json!(material)),
            None,
        ));

        Ok(material)
    }

    /// 追加材料价格（仅管理员）
    pub async fn add_material_price(
        &self,
        caller: &Caller,
        request: AddMaterialPriceRequest,
    ) -> ApiResult<MaterialPrice> {
        Self::ensure_admin(caller)?;
        if !request.price_per_lb.is_finite() || request.price_per_lb <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "price_per_lb 必须为正数, 实际为 {}",
                request.price_per_lb
            )));
        }
        let effective_date = parse_date(&request.effective_date)?;
        let source = request
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if self
            .material_store
            .find_material(&request.material_id)
            .await?
            .is_none()
        {
            return Err(ApiError::NotFound(format!(
                "材料 {} 不存在",
                request.material_id
            )));
        }

        let price = MaterialPrice {
            price_id: uuid::Uuid::new_v4().to_string(),
            material_id: request.material_id,
            price_per_lb: request.price_per_lb,
            effective_date,
            source,
            created_at: chrono::Local::now().naive_local(),
        };
        self.material_store.insert_price(&price).await?;

        info!(
            material_id = %price.material_id,
            price_per_lb = price.price_per_lb,
            effective_date = %price.effective_date,
            "材料价格已追加"
        );

        self.record_action(ActionLog::new(
            ActionType::AddMaterialPrice,
            None,
            &caller.user_id,
            Some(json!(price)),
            None,
        ));

        Ok(price)
    }

    /// 价格历史（仅管理员, 生效日期倒序）
    pub async fn list_material_prices(
        &self,
        caller: &Caller,
        material_id: &str,
    ) -> ApiResult<Vec<MaterialPrice>> {
        Self::ensure_admin(caller)?;
        Ok(self.material_store.list_prices(material_id).await?)
    }
}
