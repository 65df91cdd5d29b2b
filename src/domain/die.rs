// ==========================================
// 挤压报价系统 - 模具成本估算领域模型
// ==========================================

use crate::domain::types::DieType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// DieEstimatorSettings - 模具估算参数（管理员可调）
// ==========================================
// 每次估算都重新读取, 不做长期缓存
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DieEstimatorSettings {
    pub a0: f64,            // 参考截面积 (in²)
    pub k: f64,             // 尺寸系数斜率
    pub cavity_slope: f64,  // 每增加一腔的成本增量
    pub low_band: f64,      // 区间下沿系数
    pub high_band: f64,     // 区间上沿系数
    pub base_solid: f64,    // 实心模基础价 ($)
    pub base_hollow: f64,   // 空心模基础价 ($)
    pub base_coex: f64,     // 共挤模基础价 ($)
}

impl Default for DieEstimatorSettings {
    fn default() -> Self {
        Self {
            a0: 0.2,
            k: 0.4,
            cavity_slope: 0.35,
            low_band: 0.9,
            high_band: 1.12,
            base_solid: 6000.0,
            base_hollow: 9500.0,
            base_coex: 14000.0,
        }
    }
}

impl DieEstimatorSettings {
    /// 按模具类型取基础价
    pub fn base_for(&self, die_type: DieType) -> f64 {
        match die_type {
            DieType::Solid => self.base_solid,
            DieType::Hollow => self.base_hollow,
            DieType::Coex => self.base_coex,
        }
    }
}

// ==========================================
// DieSettingsRecord - 持久化的参数行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DieSettingsRecord {
    pub settings_id: String,
    pub settings: DieEstimatorSettings,
    pub updated_by: Option<String>,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// DieCostDrivers - 估算驱动因子（可解释性）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DieCostDrivers {
    pub area_in2: f64,
    pub cavities: u32,
    pub base: f64,
    pub size_factor: f64,
    pub cavity_multiplier: f64,
}

// ==========================================
// DieCostEstimate - 估算结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DieCostEstimate {
    pub die_type: DieType,
    pub expected: f64,
    pub low: f64,
    pub high: f64,
    pub drivers: DieCostDrivers,
}
