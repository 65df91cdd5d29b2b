// ==========================================
// 挤压报价系统 - 报价 API
// ==========================================
// 职责: 创建报价、重算修订、报价详情、删除报价、修订对账
// 所有成功写入记录 ActionLog
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::quote::{Quote, QuoteRequest, QuoteRevision};
use crate::domain::types::{Caller, RevisionState};
use crate::engine::orchestrator::{ReconcileReport, RevisionOrchestrator};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::QuoteStore;

// ==========================================
// 响应结构
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateQuoteResponse {
    pub quote_id: String,
    pub quote_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeRevisionResponse {
    pub revision_id: String,
    pub revision_number: i32,
}

/// 报价详情: 报价头 + 当前修订 + 全部修订
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDetail {
    pub quote: Quote,
    pub current_revision: Option<QuoteRevision>,
    pub revisions: Vec<QuoteRevision>,
    pub revision_state: RevisionState,
}

// ==========================================
// QuoteApi - 报价 API
// ==========================================
pub struct QuoteApi {
    orchestrator: Arc<RevisionOrchestrator>,
    quote_store: Arc<dyn QuoteStore>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl QuoteApi {
    /// 创建新的QuoteApi实例
    pub fn new(
        orchestrator: Arc<RevisionOrchestrator>,
        quote_store: Arc<dyn QuoteStore>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            orchestrator,
            quote_store,
            action_log_repo,
        }
    }

    /// 写操作日志（失败只告警, 不影响主流程）
    fn record_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(
                action_type = %log.action_type,
                quote_id = ?log.quote_id,
                error = %e,
                "操作日志写入失败"
            );
        }
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 创建报价
    ///
    /// # 返回
    /// - Ok(CreateQuoteResponse): 报价ID与报价号
    /// - Err(ApiError): Forbidden / InvalidInput / NotFound / PersistenceConflict
    pub async fn create_quote(
        &self,
        caller: &Caller,
        request: QuoteRequest,
    ) -> ApiResult<CreateQuoteResponse> {
        let created = self.orchestrator.create(caller, &request).await?;

        self.record_action(ActionLog::new(
            ActionType::CreateQuote,
            Some(created.quote_id.clone()),
            &caller.user_id,
            Some(json!({
                "quote_number": created.quote_number,
                "revision_id": created.revision_id,
                "request": request,
            })),
            None,
        ));

        Ok(CreateQuoteResponse {
            quote_id: created.quote_id,
            quote_number: created.quote_number,
        })
    }

    /// 以当前材料价格重算报价
    pub async fn recompute_revision(
        &self,
        caller: &Caller,
        quote_id: &str,
    ) -> ApiResult<RecomputeRevisionResponse> {
        let recomputed = self.orchestrator.recompute(caller, quote_id).await?;

        self.record_action(ActionLog::new(
            ActionType::RecomputeRevision,
            Some(recomputed.quote_id.clone()),
            &caller.user_id,
            Some(json!({
                "revision_id": recomputed.revision_id,
                "revision_number": recomputed.revision_number,
                "superseded_revision_id": recomputed.superseded_revision_id,
            })),
            None,
        ));

        Ok(RecomputeRevisionResponse {
            revision_id: recomputed.revision_id,
            revision_number: recomputed.revision_number,
        })
    }

    /// 删除报价及全部修订（仅管理员）
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn delete_quote(&self, caller: &Caller, quote_id: &str) -> ApiResult<()> {
        if !caller.role.is_admin() {
            return Err(ApiError::Forbidden(format!(
                "角色 {} 不允许删除报价",
                caller.role
            )));
        }
        if quote_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("quote_id 不能为空".to_string()));
        }

        let quote = self
            .quote_store
            .find_quote(quote_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("报价 {} 不存在", quote_id)))?;

        if !self.quote_store.delete_quote(quote_id).await? {
            return Err(ApiError::NotFound(format!("报价 {} 不存在", quote_id)));
        }

        self.record_action(ActionLog::new(
            ActionType::DeleteQuote,
            Some(quote.quote_id.clone()),
            &caller.user_id,
            Some(json!({ "quote_number": quote.quote_number })),
            None,
        ));
        Ok(())
    }

    /// 修订对账: 修复没有当前修订的报价
    pub async fn reconcile_revisions(&self, caller: &Caller) -> ApiResult<ReconcileReport> {
        let report = self.orchestrator.reconcile_revisions(caller).await?;

        for repaired in &report.repaired {
            self.record_action(ActionLog::new(
                ActionType::RepairRevision,
                Some(repaired.quote_id.clone()),
                &caller.user_id,
                Some(json!({
                    "revision_id": repaired.revision_id,
                    "revision_number": repaired.revision_number,
                })),
                Some("提升最高修订为当前修订".to_string()),
            ));
        }

        Ok(report)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 报价详情（任意已认证角色）
    pub async fn get_quote_detail(&self, _caller: &Caller, quote_id: &str) -> ApiResult<QuoteDetail> {
        let quote = self
            .quote_store
            .find_quote(quote_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("报价 {} 不存在", quote_id)))?;

        let revisions = self.quote_store.list_revisions(quote_id).await?;
        let current_revision = revisions.iter().find(|r| r.is_current).cloned();
        let revision_state = self.orchestrator.revision_state(quote_id).await?;

        Ok(QuoteDetail {
            quote,
            current_revision,
            revisions,
            revision_state,
        })
    }
}
