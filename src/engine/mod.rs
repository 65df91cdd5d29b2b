// ==========================================
// 挤压报价系统 - 引擎层
// ==========================================
// 职责: 定价计算、修订编排、模具估算
// 红线: Engine 不拼 SQL, 数据访问只经由 Store Trait
// ==========================================

pub mod die_cost;
pub mod eau_tier;
pub mod error;
pub mod moq_table;
pub mod orchestrator;
pub mod pipeline;
pub mod price_resolver;
pub mod pricing;
pub mod quote_number;
pub mod weight;

// 重导出核心引擎
pub use die_cost::DieCostEstimator;
pub use eau_tier::EauTierGenerator;
pub use error::{EngineError, EngineResult};
pub use moq_table::MoqTableBuilder;
pub use orchestrator::{
    CreatedQuote, ReconcileReport, RecomputedRevision, RepairedQuote, RevisionOrchestrator,
};
pub use pipeline::PricingPipeline;
pub use price_resolver::MaterialPriceResolver;
pub use pricing::{BasePrice, BasePricingModel};
pub use weight::{Geometry, WeightCalculator};
