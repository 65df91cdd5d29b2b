// ==========================================
// 挤压报价系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 挤压型材报价定价与修订引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 定价与修订规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件组装与命令分发
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Caller, DieType, QuoteStatus, RevisionState, Role};

// 领域实体
pub use domain::{
    ActionLog, ActionType, DieCostEstimate, DieEstimatorSettings, EauMoqConfig, EauMoqTier,
    Material, MaterialPrice, Quote, QuoteRequest, QuoteRevision, RevisionOutputs,
};

// 引擎
pub use engine::{
    DieCostEstimator, EauTierGenerator, EngineError, MoqTableBuilder, PricingPipeline,
    RevisionOrchestrator, WeightCalculator,
};

// API
pub use api::{ApiError, DieEstimatorApi, MaterialPriceApi, QuoteApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "挤压报价系统";

// 数据库文件名
pub const DB_FILE_NAME: &str = "quote_engine.db";
