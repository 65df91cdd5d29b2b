// ==========================================
// 挤压报价系统 - 配置层
// ==========================================
// 职责: 定价倍率、阶梯/MOQ 参数、报价号重试次数
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod pricing_config_trait;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, ConfigManager, ConfigScope, DEFAULT_PRICING_MULTIPLIER,
    DEFAULT_QUOTE_NUMBER_MAX_ATTEMPTS,
};
pub use pricing_config_trait::PricingConfigReader;
