// ==========================================
// 挤压报价系统 - 定价配置读取 Trait
// ==========================================
// 职责: 定义报价引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::quote::EauMoqConfig;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// PricingConfigReader Trait
// ==========================================
// 用途: 创建/重算修订时读取当前配置（每次调用都重新读取）
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PricingConfigReader: Send + Sync {
    /// 价格倍率
    ///
    /// # 默认值
    /// - 2.5
    async fn get_pricing_multiplier(&self) -> Result<f64, Box<dyn Error>>;

    /// 阶梯折扣与 MOQ 参数
    ///
    /// # 默认值
    /// - k=0.08, f_min=0.85, gp_min_order=500, setup_charge=250, moq_floor=500
    async fn get_eau_moq_config(&self) -> Result<EauMoqConfig, Box<dyn Error>>;

    /// 报价号生成尝试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_quote_number_max_attempts(&self) -> Result<u32, Box<dyn Error>>;
}
