// ==========================================
// 挤压报价系统 - 材料领域模型
// ==========================================
// 红线: 材料一旦有价格历史即不可变; 价格只追加不修改
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Material - 材料主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub material_id: String,    // 材料ID
    pub density_lb_in3: f64,    // 密度 (lb/in³)
    pub family: String,         // 材料族 (如 6063)
    pub grade: String,          // 牌号/状态 (如 T5)
    pub created_at: NaiveDateTime,
}

// ==========================================
// MaterialPrice - 材料价格（按生效日期追加）
// ==========================================
// "截至D日的有效价格" = effective_date <= D 中 effective_date 最大的一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPrice {
    pub price_id: String,
    pub material_id: String,
    pub price_per_lb: f64,          // 单价 ($/lb)
    pub effective_date: NaiveDate,  // 生效日期
    pub source: Option<String>,     // 来源（供应商报价单号等）
    pub created_at: NaiveDateTime,
}

impl MaterialPrice {
    /// 判断该价格在参考日期是否已生效
    pub fn is_effective_on(&self, as_of: NaiveDate) -> bool {
        self.effective_date <= as_of
    }
}
