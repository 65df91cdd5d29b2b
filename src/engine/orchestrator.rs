// ==========================================
// 挤压报价系统 - 修订编排器
// ==========================================
// 用途: 创建报价 / 重算修订 / 对账修复
// ==========================================
// 红线: 输入校验先于任何 I/O
// 红线: 每个报价恰好一条当前修订, 修订号逐次 +1
// 红线: 同一报价同时只允许一个重算, 后到者直接拒绝
// ==========================================

use crate::config::PricingConfigReader;
use crate::domain::quote::{EauMoqConfig, Quote, QuoteRequest, QuoteRevision, RevisionInputs};
use crate::domain::types::{Caller, QuoteStatus, RevisionState};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::pipeline::{validate_request, PricingPipeline};
use crate::engine::price_resolver::MaterialPriceResolver;
use crate::engine::quote_number::generate_quote_number;
use crate::repository::error::RepositoryError;
use crate::repository::{MaterialStore, QuoteStore};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{error, info, instrument, warn};

// ==========================================
// 编排结果
// ==========================================

/// 创建报价结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedQuote {
    pub quote_id: String,
    pub quote_number: String,
    pub revision_id: String,
}

/// 重算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputedRevision {
    pub quote_id: String,
    pub revision_id: String,
    pub revision_number: i32,
    pub superseded_revision_id: String,
}

/// 对账修复的单个报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairedQuote {
    pub quote_id: String,
    pub revision_id: String,
    pub revision_number: i32,
}

/// 对账报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub repaired: Vec<RepairedQuote>,
    pub skipped: Vec<String>,
}

// ==========================================
// RecomputePermit - 重算许可
// ==========================================
// 持有期间 quote_id 留在进行中集合; 释放即移除
struct RecomputePermit<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    quote_id: String,
}

impl Drop for RecomputePermit<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.quote_id);
    }
}

// ==========================================
// RevisionOrchestrator - 修订编排器
// ==========================================
pub struct RevisionOrchestrator {
    quotes: Arc<dyn QuoteStore>,
    config: Arc<dyn PricingConfigReader>,
    resolver: MaterialPriceResolver,
    pipeline: PricingPipeline,
    // 进程内咨询锁: 正在重算的 quote_id
    in_flight: Mutex<HashSet<String>>,
}

impl RevisionOrchestrator {
    /// 创建新的编排器实例
    pub fn new(
        materials: Arc<dyn MaterialStore>,
        quotes: Arc<dyn QuoteStore>,
        config: Arc<dyn PricingConfigReader>,
    ) -> Self {
        Self {
            quotes,
            config,
            resolver: MaterialPriceResolver::new(materials),
            pipeline: PricingPipeline::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn ensure_can_mutate(caller: &Caller) -> EngineResult<()> {
        if caller.role.can_mutate_quotes() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "角色 {} 不允许创建或重算报价",
                caller.role
            )))
        }
    }

    /// 尝试登记重算; 已有进行中的重算时返回 None
    fn try_begin(&self, quote_id: &str) -> EngineResult<Option<RecomputePermit<'_>>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        if !in_flight.insert(quote_id.to_string()) {
            return Ok(None);
        }
        Ok(Some(RecomputePermit {
            in_flight: &self.in_flight,
            quote_id: quote_id.to_string(),
        }))
    }

    /// 只读查询, 不占用许可
    fn is_transitioning(&self, quote_id: &str) -> EngineResult<bool> {
        let in_flight = self
            .in_flight
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(in_flight.contains(quote_id))
    }

    async fn load_pricing_config(&self) -> EngineResult<(f64, EauMoqConfig)> {
        let multiplier = self
            .config
            .get_pricing_multiplier()
            .await
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let eau_moq = self
            .config
            .get_eau_moq_config()
            .await
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok((multiplier, eau_moq))
    }

    /// 计算一条修订快照
    ///
    /// 返回 (inputs_json, outputs_json, price_per_lb, multiplier)
    async fn compute_snapshot(
        &self,
        request: &QuoteRequest,
        now: NaiveDateTime,
    ) -> EngineResult<(serde_json::Value, serde_json::Value, f64, f64)> {
        let context = self
            .resolver
            .resolve_context(&request.material_id, now.date())
            .await?;
        let (multiplier, eau_moq) = self.load_pricing_config().await?;

        let outputs = self.pipeline.run(request, &context, multiplier, &eau_moq)?;

        let mut stored_request = request.clone();
        stored_request.eau_base = Some(outputs.eau_base);
        let price_per_lb = context.price_per_lb;
        let inputs = RevisionInputs {
            request: stored_request,
            context,
        };

        Ok((
            serde_json::to_value(&inputs)?,
            serde_json::to_value(&outputs)?,
            price_per_lb,
            multiplier,
        ))
    }

    // ==========================================
    // 创建报价
    // ==========================================

    /// 创建报价及第 1 版修订（报价号尝试次数读取配置）
    pub async fn create(&self, caller: &Caller, request: &QuoteRequest) -> EngineResult<CreatedQuote> {
        Self::ensure_can_mutate(caller)?;
        validate_request(request)?;

        let max_attempts = self
            .config
            .get_quote_number_max_attempts()
            .await
            .map_err(|e| EngineError::Config(e.to_string()))?;
        self.create_at(caller, request, Self::now(), max_attempts).await
    }

    /// 创建报价及第 1 版修订
    ///
    /// # 参数
    /// - now: 报价时间（价格按 now 的日期解析, 报价号取 now）
    /// - max_attempts: 报价号唯一冲突时的最大尝试次数
    #[instrument(skip(self, request), fields(
        user_id = %caller.user_id,
        material_id = %request.material_id,
        customer_id = %request.customer_id
    ))]
    pub async fn create_at(
        &self,
        caller: &Caller,
        request: &QuoteRequest,
        now: NaiveDateTime,
        max_attempts: u32,
    ) -> EngineResult<CreatedQuote> {
        Self::ensure_can_mutate(caller)?;
        validate_request(request)?;
        if max_attempts == 0 {
            return Err(EngineError::InvalidInput("报价号尝试次数至少为 1".to_string()));
        }

        let (inputs_json, outputs_json, price_per_lb, multiplier) =
            self.compute_snapshot(request, now).await?;

        // 报价号: 仅唯一冲突重试, 其他错误直接返回
        let quote_id = uuid::Uuid::new_v4().to_string();
        let mut inserted: Option<Quote> = None;
        for attempt in 1..=max_attempts {
            let quote = Quote {
                quote_id: quote_id.clone(),
                quote_number: generate_quote_number(now),
                customer_id: request.customer_id.clone(),
                status: QuoteStatus::Draft,
                created_by: caller.user_id.clone(),
                created_at: now,
            };

            match self.quotes.insert_quote(&quote).await {
                Ok(()) => {
                    inserted = Some(quote);
                    break;
                }
                Err(e) if e.is_unique_violation() => {
                    warn!(
                        attempt,
                        max_attempts,
                        quote_number = %quote.quote_number,
                        "报价号冲突, 重新生成"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        let quote = inserted.ok_or_else(|| {
            EngineError::PersistenceConflict(format!(
                "报价号连续 {} 次冲突, 放弃创建",
                max_attempts
            ))
        })?;

        let revision = QuoteRevision {
            revision_id: uuid::Uuid::new_v4().to_string(),
            quote_id: quote.quote_id.clone(),
            revision_number: 1,
            is_current: true,
            inputs_json,
            outputs_json,
            material_price_used: price_per_lb,
            multiplier_used: multiplier,
            created_by: caller.user_id.clone(),
            created_at: now,
        };

        if let Err(e) = self.quotes.insert_revision(&revision).await {
            // 不保留没有修订的报价
            if let Err(cleanup) = self.quotes.delete_quote(&quote.quote_id).await {
                error!(
                    quote_id = %quote.quote_id,
                    error = %cleanup,
                    "首版修订写入失败后删除报价失败"
                );
            }
            return Err(e.into());
        }

        info!(
            quote_id = %quote.quote_id,
            quote_number = %quote.quote_number,
            revision_id = %revision.revision_id,
            "报价已创建"
        );

        Ok(CreatedQuote {
            quote_id: quote.quote_id,
            quote_number: quote.quote_number,
            revision_id: revision.revision_id,
        })
    }

    // ==========================================
    // 重算修订
    // ==========================================

    /// 以当前材料价格重算报价
    pub async fn recompute(&self, caller: &Caller, quote_id: &str) -> EngineResult<RecomputedRevision> {
        self.recompute_at(caller, quote_id, Self::now()).await
    }

    /// 以 now 当日的有效价格重算报价
    ///
    /// 请求参数原样沿用当前修订, 材料上下文重新解析
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn recompute_at(
        &self,
        caller: &Caller,
        quote_id: &str,
        now: NaiveDateTime,
    ) -> EngineResult<RecomputedRevision> {
        Self::ensure_can_mutate(caller)?;
        if quote_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("quote_id 不能为空".to_string()));
        }

        let _permit = self
            .try_begin(quote_id)?
            .ok_or_else(|| EngineError::ConcurrentRecompute(quote_id.to_string()))?;

        if self.quotes.find_quote(quote_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("报价 {} 不存在", quote_id)));
        }
        let current = self
            .quotes
            .find_current_revision(quote_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("报价 {} 没有当前修订", quote_id)))?;

        let request: QuoteRequest = serde_json::from_value(current.inputs_json.clone())?;
        validate_request(&request)?;

        let (inputs_json, outputs_json, price_per_lb, multiplier) =
            self.compute_snapshot(&request, now).await?;

        let next = QuoteRevision {
            revision_id: uuid::Uuid::new_v4().to_string(),
            quote_id: quote_id.to_string(),
            revision_number: current.revision_number + 1,
            is_current: true,
            inputs_json,
            outputs_json,
            material_price_used: price_per_lb,
            multiplier_used: multiplier,
            created_by: caller.user_id.clone(),
            created_at: now,
        };

        match self.quotes.supersede_current(&current, &next).await {
            Ok(()) => {}
            Err(RepositoryError::CurrentRevisionChanged { .. }) => {
                return Err(EngineError::ConcurrentRecompute(quote_id.to_string()));
            }
            Err(e) if e.is_unique_violation() => {
                return Err(EngineError::ConcurrentRecompute(quote_id.to_string()));
            }
            Err(RepositoryError::PartialTransition {
                quote_id,
                demoted_revision_id,
                cause,
            }) => {
                error!(
                    event = "partial_revision_failure",
                    quote_id = %quote_id,
                    demoted_revision_id = %demoted_revision_id,
                    attempted_revision_id = %next.revision_id,
                    cause = %cause,
                    "旧修订已降级但新修订写入失败, 报价暂无当前修订"
                );
                return Err(EngineError::PartialRevisionFailure {
                    quote_id,
                    demoted_revision_id,
                    cause,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            quote_id = %quote_id,
            revision_id = %next.revision_id,
            revision_number = next.revision_number,
            price_per_lb,
            "报价已重算"
        );

        Ok(RecomputedRevision {
            quote_id: quote_id.to_string(),
            revision_id: next.revision_id,
            revision_number: next.revision_number,
            superseded_revision_id: current.revision_id,
        })
    }

    // ==========================================
    // 状态与对账
    // ==========================================

    /// 报价修订状态
    pub async fn revision_state(&self, quote_id: &str) -> EngineResult<RevisionState> {
        if self.quotes.find_quote(quote_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("报价 {} 不存在", quote_id)));
        }
        if self.is_transitioning(quote_id)? {
            return Ok(RevisionState::Transitioning);
        }

        let current_count = self
            .quotes
            .list_revisions(quote_id)
            .await?
            .iter()
            .filter(|r| r.is_current)
            .count();
        Ok(RevisionState::from_current_count(current_count))
    }

    /// 对账: 为没有当前修订的报价提升最高修订号
    ///
    /// 幂等; 正在重算的报价跳过
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn reconcile_revisions(&self, caller: &Caller) -> EngineResult<ReconcileReport> {
        Self::ensure_can_mutate(caller)?;

        let orphaned = self.quotes.find_quotes_without_current().await?;
        let mut report = ReconcileReport {
            scanned: orphaned.len(),
            ..Default::default()
        };

        for quote_id in orphaned {
            let Some(_permit) = self.try_begin(&quote_id)? else {
                report.skipped.push(quote_id);
                continue;
            };

            let latest = self
                .quotes
                .list_revisions(&quote_id)
                .await?
                .into_iter()
                .max_by_key(|r| r.revision_number);
            let Some(latest) = latest else {
                continue;
            };

            match self.quotes.promote_revision(&latest.revision_id).await {
                Ok(()) => {
                    warn!(
                        quote_id = %quote_id,
                        revision_id = %latest.revision_id,
                        revision_number = latest.revision_number,
                        "对账: 已将最高修订提升为当前修订"
                    );
                    report.repaired.push(RepairedQuote {
                        quote_id,
                        revision_id: latest.revision_id,
                        revision_number: latest.revision_number,
                    });
                }
                Err(e) if e.is_unique_violation() => {
                    // 其他进程已补上当前修订
                    report.skipped.push(quote_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            scanned = report.scanned,
            repaired = report.repaired.len(),
            skipped = report.skipped.len(),
            "修订对账完成"
        );
        Ok(report)
    }
}
