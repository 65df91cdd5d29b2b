// ==========================================
// 挤压报价系统 - API 层
// ==========================================
// 职责: JSON 可序列化的业务接口门面
// ==========================================

pub mod die_estimator_api;
pub mod error;
pub mod material_price_api;
pub mod quote_api;

pub use die_estimator_api::{DieEstimateRequest, DieEstimatorApi};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use material_price_api::{AddMaterialPriceRequest, AddMaterialRequest, MaterialPriceApi};
pub use quote_api::{CreateQuoteResponse, QuoteApi, QuoteDetail, RecomputeRevisionResponse};
