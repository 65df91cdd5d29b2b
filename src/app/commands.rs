// ==========================================
// 挤压报价系统 - 命令分发
// ==========================================
// 职责: 命令名 → API 调用, JSON 请求进、JSON 响应出
// ==========================================

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{
    AddMaterialPriceRequest, AddMaterialRequest, ApiError, ApiResult, DieEstimateRequest,
};
use crate::app::state::AppState;
use crate::domain::die::DieEstimatorSettings;
use crate::domain::quote::QuoteRequest;
use crate::domain::types::{Caller, Role};

/// 可分发的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Init,
    CreateQuote,
    Recompute,
    QuoteDetail,
    DeleteQuote,
    Reconcile,
    DieEstimate,
    DieSettings,
    UpdateDieSettings,
    AddMaterial,
    AddMaterialPrice,
    ListMaterialPrices,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        let command = match name.trim() {
            "init" => Command::Init,
            "create-quote" => Command::CreateQuote,
            "recompute" => Command::Recompute,
            "quote-detail" => Command::QuoteDetail,
            "delete-quote" => Command::DeleteQuote,
            "reconcile" => Command::Reconcile,
            "die-estimate" => Command::DieEstimate,
            "die-settings" => Command::DieSettings,
            "update-die-settings" => Command::UpdateDieSettings,
            "add-material" => Command::AddMaterial,
            "add-material-price" => Command::AddMaterialPrice,
            "list-material-prices" => Command::ListMaterialPrices,
            _ => return None,
        };
        Some(command)
    }

    /// 是否需要 JSON 请求体
    pub fn takes_payload(&self) -> bool {
        !matches!(
            self,
            Command::Init | Command::Reconcile | Command::DieSettings
        )
    }

    pub fn names() -> &'static [&'static str] {
        &[
            "init",
            "create-quote",
            "recompute",
            "quote-detail",
            "delete-quote",
            "reconcile",
            "die-estimate",
            "die-settings",
            "update-die-settings",
            "add-material",
            "add-material-price",
            "list-material-prices",
        ]
    }
}

#[derive(Debug, Deserialize)]
struct QuoteIdPayload {
    quote_id: String,
}

#[derive(Debug, Deserialize)]
struct MaterialIdPayload {
    material_id: String,
}

/// 从环境变量读取调用方身份
///
/// - QUOTE_ENGINE_USER: 用户ID（默认 local）
/// - QUOTE_ENGINE_ROLE: admin / estimator / viewer（未知按 viewer）
pub fn caller_from_env() -> Caller {
    let user_id = std::env::var("QUOTE_ENGINE_USER")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "local".to_string());
    let role = std::env::var("QUOTE_ENGINE_ROLE")
        .map(|v| Role::from_str(&v))
        .unwrap_or(Role::Viewer);
    Caller::new(user_id, role)
}

fn parse_payload<T: DeserializeOwned>(payload: &str) -> ApiResult<T> {
    serde_json::from_str(payload)
        .map_err(|e| ApiError::InvalidInput(format!("请求JSON解析失败: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::InternalError(format!("序列化失败: {}", e)))
}

/// 执行一条命令
pub async fn dispatch(
    state: &AppState,
    caller: &Caller,
    command: Command,
    payload: &str,
) -> ApiResult<Value> {
    tracing::debug!(command = ?command, user_id = %caller.user_id, "执行命令");

    match command {
        Command::Init => Ok(json!({
            "db_path": state.db_path,
            "schema_version": state.schema_version,
            "version": crate::VERSION,
        })),
        Command::CreateQuote => {
            let request: QuoteRequest = parse_payload(payload)?;
            to_json(&state.quote_api.create_quote(caller, request).await?)
        }
        Command::Recompute => {
            let p: QuoteIdPayload = parse_payload(payload)?;
            to_json(&state.quote_api.recompute_revision(caller, &p.quote_id).await?)
        }
        Command::QuoteDetail => {
            let p: QuoteIdPayload = parse_payload(payload)?;
            to_json(&state.quote_api.get_quote_detail(caller, &p.quote_id).await?)
        }
        Command::DeleteQuote => {
            let p: QuoteIdPayload = parse_payload(payload)?;
            state.quote_api.delete_quote(caller, &p.quote_id).await?;
            Ok(json!({ "deleted": p.quote_id }))
        }
        Command::Reconcile => to_json(&state.quote_api.reconcile_revisions(caller).await?),
        Command::DieEstimate => {
            let request: DieEstimateRequest = parse_payload(payload)?;
            to_json(&state.die_estimator_api.evaluate(&request)?)
        }
        Command::DieSettings => to_json(&state.die_estimator_api.get_settings()?),
        Command::UpdateDieSettings => {
            let settings: DieEstimatorSettings = parse_payload(payload)?;
            to_json(&state.die_estimator_api.update_settings(caller, settings)?)
        }
        Command::AddMaterial => {
            let request: AddMaterialRequest = parse_payload(payload)?;
            to_json(&state.material_price_api.add_material(caller, request).await?)
        }
        Command::AddMaterialPrice => {
            let request: AddMaterialPriceRequest = parse_payload(payload)?;
            to_json(
                &state
                    .material_price_api
                    .add_material_price(caller, request)
                    .await?,
            )
        }
        Command::ListMaterialPrices => {
            let p: MaterialIdPayload = parse_payload(payload)?;
            to_json(
                &state
                    .material_price_api
                    .list_material_prices(caller, &p.material_id)
                    .await?,
            )
        }
    }
}
