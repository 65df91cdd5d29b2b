// ==========================================
// 挤压报价系统 - 模具成本参数化估算
// ==========================================
// sizeFactor       = 1 + k × max(0, (area − a0) / a0)
// cavityMultiplier = 1 + cavity_slope × (cavities − 1)
// expected         = base(dieType) × sizeFactor × cavityMultiplier
// 区间             = [expected × low_band, expected × high_band]
// ==========================================
// 纯函数: 参数由调用方显式传入, 引擎不读取存储
// ==========================================

use crate::domain::die::{DieCostDrivers, DieCostEstimate, DieEstimatorSettings};
use crate::domain::types::DieType;
use crate::engine::error::{EngineError, EngineResult};
use tracing::instrument;

#[derive(Debug, Default, Clone, Copy)]
pub struct DieCostEstimator;

impl DieCostEstimator {
    pub fn new() -> Self {
        Self
    }

    /// 估算模具成本
    ///
    /// 腔数小于 1 时按 1 计
    #[instrument(skip(self, settings), fields(die_type = %die_type))]
    pub fn evaluate(
        &self,
        die_type: DieType,
        area_in2: f64,
        cavities: i64,
        settings: &DieEstimatorSettings,
    ) -> EngineResult<DieCostEstimate> {
        if !area_in2.is_finite() || area_in2 <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "截面积必须为正数, 实际为 {}",
                area_in2
            )));
        }
        if !settings.a0.is_finite() || settings.a0 <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "参考截面积 a0 必须为正数, 实际为 {}",
                settings.a0
            )));
        }

        let cavities = cavities.clamp(1, u32::MAX as i64) as u32;
        let base = settings.base_for(die_type);

        let size_factor = 1.0 + settings.k * ((area_in2 - settings.a0) / settings.a0).max(0.0);
        let cavity_multiplier = 1.0 + settings.cavity_slope * (cavities as f64 - 1.0);
        let expected = base * size_factor * cavity_multiplier;

        Ok(DieCostEstimate {
            die_type,
            expected,
            low: expected * settings.low_band,
            high: expected * settings.high_band,
            drivers: DieCostDrivers {
                area_in2,
                cavities,
                base,
                size_factor,
                cavity_multiplier,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_area_single_cavity_equals_base() {
        let settings = DieEstimatorSettings::default();
        let est = DieCostEstimator::new()
            .evaluate(DieType::Hollow, settings.a0, 1, &settings)
            .unwrap();
        assert_eq!(est.drivers.size_factor, 1.0);
        assert_eq!(est.drivers.cavity_multiplier, 1.0);
        assert_eq!(est.expected, 9500.0);
        assert!((est.low - 8550.0).abs() < 1e-9);
        assert!((est.high - 10640.0).abs() < 1e-9);
    }

    #[test]
    fn test_larger_area_and_cavities() {
        let settings = DieEstimatorSettings::default();
        // size = 1 + 0.4 × (0.6 − 0.2)/0.2 = 1.8, cavity = 1 + 0.35 × 2 = 1.7
        let est = DieCostEstimator::new()
            .evaluate(DieType::Solid, 0.6, 3, &settings)
            .unwrap();
        assert!((est.drivers.size_factor - 1.8).abs() < 1e-9);
        assert!((est.drivers.cavity_multiplier - 1.7).abs() < 1e-9);
        assert!((est.expected - 6000.0 * 1.8 * 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_small_area_does_not_discount_and_cavities_floor_to_one() {
        let settings = DieEstimatorSettings::default();
        let est = DieCostEstimator::new()
            .evaluate(DieType::Coex, 0.05, 0, &settings)
            .unwrap();
        assert_eq!(est.drivers.size_factor, 1.0);
        assert_eq!(est.drivers.cavities, 1);
        assert_eq!(est.expected, 14000.0);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let settings = DieEstimatorSettings::default();
        let estimator = DieCostEstimator::new();
        let a = estimator.evaluate(DieType::Solid, 0.75, 2, &settings).unwrap();
        let b = estimator.evaluate(DieType::Solid, 0.75, 2, &settings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_area_rejected() {
        let settings = DieEstimatorSettings::default();
        let estimator = DieCostEstimator::new();
        for area in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                estimator.evaluate(DieType::Solid, area, 1, &settings),
                Err(EngineError::InvalidInput(_))
            ));
        }
    }
}
