// ==========================================
// 修订编排集成测试
// ==========================================
// 职责: 创建/重算/对账的端到端行为, 含故障注入路径
// ==========================================


#[cfg(test)]
mod revision_workflow_test {
    use std::sync::Arc;

    use extrusion_quote::config::config_keys;
    use extrusion_quote::domain::{RevisionInputs, RevisionOutputs};
    use extrusion_quote::engine::EngineError;
    use extrusion_quote::repository::{QuoteStore, RepositoryError};
    use extrusion_quote::RevisionState;

    use crate::test_helpers::*;

    // ==========================================
    // 创建与重算
    // ==========================================

    #[tokio::test]
    async fn test_create_then_sequential_recomputes_keep_single_current() {
        let env = TestEnv::seeded().await;
        let orchestrator = env.orchestrator();

        let created = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();
        assert!(created.quote_number.starts_with("Q-20260301-100000-"));

        let n = 5;
        let mut last = None;
        for i in 0..n {
            let recomputed = orchestrator
                .recompute_at(&estimator(), &created.quote_id, ts("2026-03-02 10:00:00"))
                .await
                .unwrap();
            assert_eq!(recomputed.revision_number, i + 2);
            last = Some(recomputed);
        }

        let last = last.unwrap();
        assert_eq!(last.revision_number, n + 1);
        assert_eq!(env.current_count(&created.quote_id), 1);

        let current = env
            .quote_repo
            .find_current_revision(&created.quote_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.revision_id, last.revision_id);

        let revisions = env.quote_repo.list_revisions(&created.quote_id).await.unwrap();
        let numbers: Vec<i32> = revisions.iter().map(|r| r.revision_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);

        assert_eq!(
            orchestrator.revision_state(&created.quote_id).await.unwrap(),
            RevisionState::CurrentSettled
        );
    }

    #[tokio::test]
    async fn test_first_revision_snapshot_contents() {
        let env = TestEnv::seeded().await;
        let mut request = sample_request();
        request.eau_base = None;

        let created = env
            .orchestrator()
            .create_at(&estimator(), &request, ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();

        let revision = env
            .quote_repo
            .find_current_revision(&created.quote_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(revision.revision_number, 1);
        assert_eq!(revision.material_price_used, PRICE_PER_LB);
        assert_eq!(revision.multiplier_used, 2.5);
        assert_eq!(revision.created_by, "estimator-1");

        let inputs: RevisionInputs = serde_json::from_value(revision.inputs_json).unwrap();
        assert_eq!(inputs.request.eau_base, Some(1000));
        assert_eq!(inputs.context.density_lb_in3, DENSITY);
        assert_eq!(inputs.context.price_effective_date, date("2020-01-01"));

        let outputs: RevisionOutputs = serde_json::from_value(revision.outputs_json).unwrap();
        assert!((outputs.weight_lb_per_piece - 0.336).abs() < 1e-9);
        let tiers: Vec<u64> = outputs.eau_moq_table.iter().map(|t| t.eau).collect();
        assert_eq!(tiers, vec![1000, 5000, 10000, 20000, 50000, 100000]);
        for tier in &outputs.eau_moq_table {
            assert!(tier.price_per_piece <= outputs.base_price_per_piece);
            assert!(tier.moq_pieces >= 500);
        }
    }

    #[tokio::test]
    async fn test_recompute_picks_up_new_price_and_config() {
        let env = TestEnv::seeded().await;
        let orchestrator = env.orchestrator();
        let created = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();

        env.add_price(MATERIAL_ID, 3.0, "2026-03-02").await;
        env.config_manager
            .set_global_config_value(config_keys::PRICING_MULTIPLIER, "3.0")
            .unwrap();

        // 新价格次日才生效
        orchestrator
            .recompute_at(&estimator(), &created.quote_id, ts("2026-03-01 18:00:00"))
            .await
            .unwrap();
        let current = env
            .quote_repo
            .find_current_revision(&created.quote_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.material_price_used, PRICE_PER_LB);
        assert_eq!(current.multiplier_used, 3.0);

        orchestrator
            .recompute_at(&estimator(), &created.quote_id, ts("2026-03-02 08:00:00"))
            .await
            .unwrap();
        let current = env
            .quote_repo
            .find_current_revision(&created.quote_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.revision_number, 3);
        assert_eq!(current.material_price_used, 3.0);
    }

    // ==========================================
    // 输入校验与权限
    // ==========================================

    #[tokio::test]
    async fn test_validation_runs_before_any_lookup() {
        let env = TestEnv::new();
        let mut request = sample_request();
        request.material_id = "UNKNOWN".to_string();
        request.weight_lb_per_ft = Some(0.5);

        let err = env
            .orchestrator()
            .create(&estimator(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)), "{:?}", err);
        assert_eq!(env.quote_count(), 0);
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_or_recompute() {
        let env = TestEnv::seeded().await;
        let orchestrator = env.orchestrator();

        let err = orchestrator.create(&viewer(), &sample_request()).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let created = orchestrator.create(&admin(), &sample_request()).await.unwrap();
        let err = orchestrator
            .recompute(&viewer(), &created.quote_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let err = orchestrator.reconcile_revisions(&viewer()).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_missing_effective_price_is_not_found() {
        let env = TestEnv::new();
        env.add_material(MATERIAL_ID, DENSITY).await;
        env.add_price(MATERIAL_ID, PRICE_PER_LB, "2027-01-01").await;

        let err = env
            .orchestrator()
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)), "{:?}", err);
        assert_eq!(env.quote_count(), 0);
    }

    #[tokio::test]
    async fn test_recompute_unknown_quote_is_not_found() {
        let env = TestEnv::seeded().await;
        let err = env
            .orchestrator()
            .recompute(&estimator(), "no-such-quote")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    // ==========================================
    // 报价号重试
    // ==========================================

    #[tokio::test]
    async fn test_quote_number_collisions_are_retried() {
        let env = TestEnv::seeded().await;
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()).with_unique_failures(2));
        let orchestrator = env.orchestrator_with(store.clone());

        let created = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();
        assert_eq!(store.insert_quote_calls(), 3);
        assert_eq!(env.current_count(&created.quote_id), 1);
    }

    #[tokio::test]
    async fn test_quote_number_collisions_exhausted() {
        let env = TestEnv::seeded().await;
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()).with_unique_failures(3));
        let orchestrator = env.orchestrator_with(store.clone());

        let err = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PersistenceConflict(_)), "{:?}", err);
        assert_eq!(store.insert_quote_calls(), 3);
        assert_eq!(env.quote_count(), 0);
    }

    #[tokio::test]
    async fn test_attempt_budget_comes_from_config() {
        let env = TestEnv::seeded().await;
        env.config_manager
            .set_global_config_value(config_keys::QUOTE_NUMBER_MAX_ATTEMPTS, "1")
            .unwrap();
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()).with_unique_failures(1));

        let err = env
            .orchestrator_with(store.clone())
            .create(&estimator(), &sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PersistenceConflict(_)));
        assert_eq!(store.insert_quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_unique_insert_error_is_not_retried() {
        let env = TestEnv::seeded().await;
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()));
        store
            .fail_insert_quote_hard
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let err = env
            .orchestrator_with(store.clone())
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Repository(_)), "{:?}", err);
        assert_eq!(store.insert_quote_calls(), 1);
    }

    #[tokio::test]
    async fn test_first_revision_failure_removes_quote() {
        let env = TestEnv::seeded().await;
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()));
        store.set_fail_revision_inserts(true);

        let err = env
            .orchestrator_with(store.clone())
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Repository(_)), "{:?}", err);
        assert_eq!(store.insert_quote_calls(), 1);
        assert_eq!(env.quote_count(), 0);
    }

    // ==========================================
    // 部分失败与对账
    // ==========================================

    #[tokio::test]
    async fn test_partial_failure_then_reconcile() {
        let env = TestEnv::seeded().await;
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()));
        let orchestrator = env.orchestrator_with(store.clone());

        let created = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();

        store.set_fail_revision_inserts(true);
        let err = orchestrator
            .recompute_at(&estimator(), &created.quote_id, ts("2026-03-02 10:00:00"))
            .await
            .unwrap_err();
        match err {
            EngineError::PartialRevisionFailure {
                quote_id,
                demoted_revision_id,
                ..
            } => {
                assert_eq!(quote_id, created.quote_id);
                assert_eq!(demoted_revision_id, created.revision_id);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        store.set_fail_revision_inserts(false);

        assert_eq!(env.current_count(&created.quote_id), 0);
        assert_eq!(
            orchestrator.revision_state(&created.quote_id).await.unwrap(),
            RevisionState::NoCurrent
        );

        // 没有当前修订时无法重算
        let err = orchestrator
            .recompute(&estimator(), &created.quote_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let report = orchestrator.reconcile_revisions(&estimator()).await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.repaired.len(), 1);
        assert_eq!(report.repaired[0].revision_id, created.revision_id);
        assert_eq!(report.repaired[0].revision_number, 1);
        assert_eq!(env.current_count(&created.quote_id), 1);

        // 幂等
        let again = orchestrator.reconcile_revisions(&estimator()).await.unwrap();
        assert_eq!(again.scanned, 0);
        assert!(again.repaired.is_empty());

        let recomputed = orchestrator
            .recompute(&estimator(), &created.quote_id)
            .await
            .unwrap();
        assert_eq!(recomputed.revision_number, 2);
        assert_eq!(env.current_count(&created.quote_id), 1);
    }

    #[tokio::test]
    async fn test_failed_recompute_leaves_current_untouched() {
        let env = TestEnv::seeded().await;
        let orchestrator = env.orchestrator();
        let created = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();

        // 删掉价格, 重算在写入前失败, 当前修订不受影响
        {
            let conn = env.conn.lock().unwrap();
            conn.execute("DELETE FROM material_prices", []).unwrap();
        }
        let err = orchestrator
            .recompute(&estimator(), &created.quote_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(env.current_count(&created.quote_id), 1);
        assert_eq!(
            orchestrator.revision_state(&created.quote_id).await.unwrap(),
            RevisionState::CurrentSettled
        );
    }

    // ==========================================
    // 并发重算
    // ==========================================

    #[tokio::test]
    async fn test_concurrent_recompute_first_caller_wins() {
        let env = TestEnv::seeded().await;
        let store = Arc::new(FaultyQuoteStore::new(env.quote_repo.clone()));
        let orchestrator = env.orchestrator_with(store.clone());

        let created = orchestrator
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();
        store.set_delay_current_lookup(true);

        let caller_a = estimator();
        let caller_b = admin();
        let (first, second, state) = futures::join!(
            orchestrator.recompute(&caller_a, &created.quote_id),
            orchestrator.recompute(&caller_b, &created.quote_id),
            orchestrator.revision_state(&created.quote_id),
        );

        let first = first.unwrap();
        assert_eq!(first.revision_number, 2);
        assert!(matches!(second, Err(EngineError::ConcurrentRecompute(ref id)) if id == &created.quote_id));
        assert_eq!(state.unwrap(), RevisionState::Transitioning);

        assert_eq!(env.current_count(&created.quote_id), 1);
        assert_eq!(
            orchestrator.revision_state(&created.quote_id).await.unwrap(),
            RevisionState::CurrentSettled
        );
    }

    #[tokio::test]
    async fn test_stale_recompute_across_orchestrators_is_rejected() {
        let env = TestEnv::seeded().await;
        let first = env.orchestrator();
        let created = first
            .create_at(&estimator(), &sample_request(), ts("2026-03-01 10:00:00"), 3)
            .await
            .unwrap();

        // 另一个进程的编排器持有不同的锁表, 由存储层条件降级兜底
        let stale = env
            .quote_repo
            .find_current_revision(&created.quote_id)
            .await
            .unwrap()
            .unwrap();
        first.recompute(&estimator(), &created.quote_id).await.unwrap();

        let mut next = stale.clone();
        next.revision_id = "rev-stale".to_string();
        next.revision_number = 2;
        let err = env
            .quote_repo
            .supersede_current(&stale, &next)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::CurrentRevisionChanged { .. }), "{:?}", err);
        assert_eq!(env.current_count(&created.quote_id), 1);
    }
}
