// ==========================================
// 挤压报价系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub quote_id: Option<String>,       // 关联报价 (模具参数/材料价格等操作为None)
    pub action_type: String,            // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以当前时间创建一条日志
    pub fn new(
        action_type: ActionType,
        quote_id: Option<String>,
        actor: &str,
        payload_json: Option<JsonValue>,
        detail: Option<String>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            quote_id,
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json,
            detail,
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateQuote,         // 创建报价
    RecomputeRevision,   // 重算修订
    RepairRevision,      // 对账修复（提升最高修订为当前）
    DeleteQuote,         // 删除报价
    AddMaterial,         // 新增材料
    AddMaterialPrice,    // 追加材料价格
    UpdateDieSettings,   // 修改模具估算参数
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateQuote => "CREATE_QUOTE",
            ActionType::RecomputeRevision => "RECOMPUTE_REVISION",
            ActionType::RepairRevision => "REPAIR_REVISION",
            ActionType::DeleteQuote => "DELETE_QUOTE",
            ActionType::AddMaterial => "ADD_MATERIAL",
            ActionType::AddMaterialPrice => "ADD_MATERIAL_PRICE",
            ActionType::UpdateDieSettings => "UPDATE_DIE_SETTINGS",
        }
    }
}
