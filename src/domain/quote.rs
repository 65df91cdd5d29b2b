// ==========================================
// 挤压报价系统 - 报价与修订领域模型
// ==========================================
// 红线: 修订一经创建不可修改, 只能被新修订取代
// 红线: 每个报价任一时刻恰好一条 is_current = true 的修订
// ==========================================

use crate::domain::types::QuoteStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 请求未给出基准 EAU 时使用的默认值 (件/年)
pub const DEFAULT_EAU_BASE: u64 = 1000;

// ==========================================
// Quote - 报价头
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: String,
    pub quote_number: String,      // 全局唯一, 形如 Q-20261019-142233-4821
    pub customer_id: String,
    pub status: QuoteStatus,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// QuoteRevision - 报价修订（不可变快照）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRevision {
    pub revision_id: String,
    pub quote_id: String,
    pub revision_number: i32,      // 从1开始, 每次重算 +1
    pub is_current: bool,
    pub inputs_json: JsonValue,    // 请求参数 + 解析出的材料上下文
    pub outputs_json: JsonValue,   // 完整计算结果（含阶梯表）
    pub material_price_used: f64,
    pub multiplier_used: f64,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// QuoteRequest - 报价请求（几何输入 + 年用量）
// ==========================================
// 截面积与每英尺重量二选一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub customer_id: String,
    pub material_id: String,
    pub finished_length_in: f64,
    #[serde(default)]
    pub area_in2: Option<f64>,
    #[serde(default)]
    pub weight_lb_per_ft: Option<f64>,
    #[serde(default)]
    pub eau_base: Option<u64>,
}

impl QuoteRequest {
    /// 基准 EAU（缺省取 DEFAULT_EAU_BASE）
    pub fn eau_base_or_default(&self) -> u64 {
        self.eau_base.unwrap_or(DEFAULT_EAU_BASE)
    }
}

// ==========================================
// MaterialContext - 计算时解析出的材料上下文（审计用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialContext {
    pub density_lb_in3: f64,
    pub material_family: String,
    pub material_grade: String,
    pub price_per_lb: f64,
    pub price_effective_date: NaiveDate,
}

// ==========================================
// RevisionInputs - inputs_json 结构
// ==========================================
// 重算时 request 部分原样沿用, context 部分重新解析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionInputs {
    #[serde(flatten)]
    pub request: QuoteRequest,
    #[serde(flatten)]
    pub context: MaterialContext,
}

// ==========================================
// EauMoqConfig - 阶梯折扣与MOQ参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EauMoqConfig {
    pub k: f64,             // 折扣曲线陡峭度
    pub f_min: f64,         // 最低价格系数 (最大折扣下限)
    pub gp_min_order: f64,  // 单笔订单最低毛利 ($)
    pub setup_charge: f64,  // 开机费用 ($)
    pub moq_floor: u64,     // MOQ 下限 (件)
}

impl Default for EauMoqConfig {
    fn default() -> Self {
        Self {
            k: 0.08,
            f_min: 0.85,
            gp_min_order: 500.0,
            setup_charge: 250.0,
            moq_floor: 500,
        }
    }
}

// ==========================================
// EauMoqTier - 单个年用量阶梯
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EauMoqTier {
    pub eau: u64,
    pub factor: f64,                  // <= 1.0, 永不高于基准价
    pub discount_pct: f64,            // 7.25 表示 -7.25%
    pub price_per_piece: f64,
    pub gross_profit_per_piece: f64,
    pub moq_pieces: u64,
    pub notes: Option<String>,
}

// ==========================================
// RevisionOutputs - outputs_json 结构
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionOutputs {
    pub weight_lb_per_piece: f64,
    pub material_cost_per_piece: f64,
    pub base_price_per_piece: f64,    // 天花板价 P_base
    pub eau_base: u64,
    pub eau_moq_config: EauMoqConfig,
    pub eau_moq_table: Vec<EauMoqTier>,
}
