// ==========================================
// 挤压报价系统 - 基准定价模型
// ==========================================
// 材料成本 = 单件重量 × 单价
// 天花板价 = 材料成本 × 倍率
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// 基准定价结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasePrice {
    pub material_cost_per_piece: f64,
    pub ceiling_price_per_piece: f64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BasePricingModel;

impl BasePricingModel {
    pub fn new() -> Self {
        Self
    }

    pub fn price(
        &self,
        weight_lb_per_piece: f64,
        price_per_lb: f64,
        multiplier: f64,
    ) -> EngineResult<BasePrice> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "价格倍率必须为正数, 实际为 {}",
                multiplier
            )));
        }
        if !price_per_lb.is_finite() || price_per_lb <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "材料单价必须为正数, 实际为 {}",
                price_per_lb
            )));
        }

        let material_cost = weight_lb_per_piece * price_per_lb;
        Ok(BasePrice {
            material_cost_per_piece: material_cost,
            ceiling_price_per_piece: material_cost * multiplier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_is_cost_times_multiplier() {
        let p = BasePricingModel::new().price(0.336, 2.0, 2.5).unwrap();
        assert!((p.material_cost_per_piece - 0.672).abs() < 1e-12);
        assert!((p.ceiling_price_per_piece - 1.68).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_multiplier() {
        let model = BasePricingModel::new();
        assert!(model.price(1.0, 1.0, 0.0).is_err());
        assert!(model.price(1.0, 1.0, -2.5).is_err());
    }
}
