// ==========================================
// 挤压报价系统 - 模具估算 API
// ==========================================
// 职责: 模具成本估算、估算参数管理
// 红线: 每次估算都重新读取参数, 不缓存
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::die::{DieCostEstimate, DieEstimatorSettings, DieSettingsRecord};
use crate::domain::types::{Caller, DieType};
use crate::engine::die_cost::DieCostEstimator;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::die_settings_repo::DieSettingsRepository;

/// 模具估算请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DieEstimateRequest {
    pub die_type: DieType,
    pub area_in2: f64,
    /// 模孔数; 小数向下取整, 不足 1 按 1
    #[serde(default = "default_cavities")]
    pub cavities: f64,
}

fn default_cavities() -> f64 {
    1.0
}

impl DieEstimateRequest {
    /// 取整后的模孔数（NaN 与越界值交由估算器收敛到 [1, u32::MAX]）
    pub fn cavity_count(&self) -> i64 {
        self.cavities.floor() as i64
    }
}

/// 校验并规整估算参数
///
/// - a0 > 0, k > 0, cavity_slope >= 0
/// - 0 < low_band < 2, 0 < high_band < 3, high_band > low_band
/// - 基础价向下取整为非负整数
pub fn normalize_settings(settings: DieEstimatorSettings) -> ApiResult<DieEstimatorSettings> {
    let s = settings;
    let positive = |name: &str, v: f64| -> ApiResult<()> {
        if v.is_finite() && v > 0.0 {
            Ok(())
        } else {
            Err(ApiError::InvalidInput(format!("{} 必须为正数, 实际为 {}", name, v)))
        }
    };

    positive("a0", s.a0)?;
    positive("k", s.k)?;
    if !s.cavity_slope.is_finite() || s.cavity_slope < 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "cavity_slope 不能为负, 实际为 {}",
            s.cavity_slope
        )));
    }
    if !(s.low_band.is_finite() && s.low_band > 0.0 && s.low_band < 2.0) {
        return Err(ApiError::InvalidInput(format!(
            "low_band 必须在 (0, 2) 内, 实际为 {}",
            s.low_band
        )));
    }
    if !(s.high_band.is_finite() && s.high_band > 0.0 && s.high_band < 3.0) {
        return Err(ApiError::InvalidInput(format!(
            "high_band 必须在 (0, 3) 内, 实际为 {}",
            s.high_band
        )));
    }
    if s.high_band <= s.low_band {
        return Err(ApiError::InvalidInput(format!(
            "high_band({}) 必须大于 low_band({})",
            s.high_band, s.low_band
        )));
    }

    let floor_base = |name: &str, v: f64| -> ApiResult<f64> {
        if !v.is_finite() {
            return Err(ApiError::InvalidInput(format!("{} 必须为有限数值", name)));
        }
        Ok(v.floor().max(0.0))
    };

    Ok(DieEstimatorSettings {
        base_solid: floor_base("base_solid", s.base_solid)?,
        base_hollow: floor_base("base_hollow", s.base_hollow)?,
        base_coex: floor_base("base_coex", s.base_coex)?,
        ..s
    })
}

// ==========================================
// DieEstimatorApi - 模具估算 API
// ==========================================
pub struct DieEstimatorApi {
    settings_repo: Arc<DieSettingsRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    estimator: DieCostEstimator,
}

impl DieEstimatorApi {
    pub fn new(
        settings_repo: Arc<DieSettingsRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            settings_repo,
            action_log_repo,
            estimator: DieCostEstimator::new(),
        }
    }

    /// 估算模具成本（使用当前生效参数）
    pub fn evaluate(&self, request: &DieEstimateRequest) -> ApiResult<DieCostEstimate> {
        let settings = self.settings_repo.current_settings()?;
        let estimate = self.estimator.evaluate(
            request.die_type,
            request.area_in2,
            request.cavity_count(),
            &settings,
        )?;
        Ok(estimate)
    }

    /// 当前生效参数
    pub fn get_settings(&self) -> ApiResult<DieEstimatorSettings> {
        Ok(self.settings_repo.current_settings()?)
    }

    /// 修改估算参数（仅管理员, 追加新行）
    pub fn update_settings(
        &self,
        caller: &Caller,
        settings: DieEstimatorSettings,
    ) -> ApiResult<DieSettingsRecord> {
        if !caller.role.is_admin() {
            return Err(ApiError::Forbidden(format!(
                "角色 {} 不允许修改模具估算参数",
                caller.role
            )));
        }

        let normalized = normalize_settings(settings)?;
        let record = DieSettingsRecord {
            settings_id: uuid::Uuid::new_v4().to_string(),
            settings: normalized,
            updated_by: Some(caller.user_id.clone()),
            updated_at: chrono::Local::now().naive_local(),
        };
        self.settings_repo.insert(&record)?;

        info!(
            settings_id = %record.settings_id,
            updated_by = %caller.user_id,
            "模具估算参数已更新"
        );

        let log = ActionLog::new(
            ActionType::UpdateDieSettings,
            None,
            &caller.user_id,
            Some(json!(record.settings)),
            None,
        );
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, "操作日志写入失败");
        }

        Ok(record)
    }
}
