// ==========================================
// 挤压报价系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod die;
pub mod material;
pub mod quote;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use die::{DieCostDrivers, DieCostEstimate, DieEstimatorSettings, DieSettingsRecord};
pub use material::{Material, MaterialPrice};
pub use quote::{
    EauMoqConfig, EauMoqTier, MaterialContext, Quote, QuoteRequest, QuoteRevision,
    RevisionInputs, RevisionOutputs, DEFAULT_EAU_BASE,
};
pub use types::{Caller, DieType, QuoteStatus, RevisionState, Role};
