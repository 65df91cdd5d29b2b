// ==========================================
// 挤压报价系统 - 定价流水线
// ==========================================
// 用途: 协调重量 → 基准定价 → 阶梯 → MOQ 表的执行顺序
// 纯计算, 不做 I/O
// ==========================================

use crate::domain::quote::{EauMoqConfig, MaterialContext, QuoteRequest, RevisionOutputs};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::{BasePricingModel, EauTierGenerator, Geometry, MoqTableBuilder, WeightCalculator};
use tracing::debug;

/// 校验报价请求（在任何 I/O 之前调用）
///
/// 返回解析后的几何输入
pub fn validate_request(request: &QuoteRequest) -> EngineResult<Geometry> {
    if request.customer_id.trim().is_empty() {
        return Err(EngineError::InvalidInput("customer_id 不能为空".to_string()));
    }
    if request.material_id.trim().is_empty() {
        return Err(EngineError::InvalidInput("material_id 不能为空".to_string()));
    }
    if !request.finished_length_in.is_finite() || request.finished_length_in <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "finished_length_in 必须为正数, 实际为 {}",
            request.finished_length_in
        )));
    }
    if request.eau_base == Some(0) {
        return Err(EngineError::InvalidInput("基准EAU必须大于0".to_string()));
    }
    Geometry::from_options(request.area_in2, request.weight_lb_per_ft)
}

// ==========================================
// PricingPipeline
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct PricingPipeline {
    weight: WeightCalculator,
    pricing: BasePricingModel,
    tiers: EauTierGenerator,
    moq: MoqTableBuilder,
}

impl PricingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// 执行完整定价流程, 生成修订输出快照
    pub fn run(
        &self,
        request: &QuoteRequest,
        context: &MaterialContext,
        multiplier: f64,
        config: &EauMoqConfig,
    ) -> EngineResult<RevisionOutputs> {
        let geometry = validate_request(request)?;
        let eau_base = request.eau_base_or_default();

        // 步骤1: 单件重量
        let weight = self.weight.weight_per_piece(
            geometry,
            request.finished_length_in,
            context.density_lb_in3,
        )?;

        // 步骤2: 材料成本与天花板价
        let base = self.pricing.price(weight, context.price_per_lb, multiplier)?;

        // 步骤3: 阶梯
        let tiers = self.tiers.generate(eau_base)?;

        // 步骤4: 折扣与 MOQ
        let table = self.moq.build(
            base.ceiling_price_per_piece,
            base.material_cost_per_piece,
            eau_base,
            &tiers,
            config,
        )?;

        debug!(
            material_id = %request.material_id,
            weight_lb_per_piece = weight,
            base_price_per_piece = base.ceiling_price_per_piece,
            tier_count = table.len(),
            "定价流水线完成"
        );

        Ok(RevisionOutputs {
            weight_lb_per_piece: weight,
            material_cost_per_piece: base.material_cost_per_piece,
            base_price_per_piece: base.ceiling_price_per_piece,
            eau_base,
            eau_moq_config: *config,
            eau_moq_table: table,
        })
    }
}
