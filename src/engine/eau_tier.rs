// ==========================================
// 挤压报价系统 - 年用量阶梯生成
// ==========================================
// {基准EAU} ∪ 固定阶梯; 基准 > 2000 时再加入 ×2/×5/×10 的取整倍数
// 去重, 升序, 纯函数
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use std::collections::BTreeSet;

/// 固定阶梯 (件/年)
pub const STANDARD_LADDER: [u64; 5] = [5_000, 10_000, 20_000, 50_000, 100_000];

/// 超过该值才加入倍数阶梯
pub const MULTIPLE_TIER_THRESHOLD: u64 = 2_000;

const MULTIPLES: [u64; 3] = [2, 5, 10];

/// 向上取整到"好看"的数
///
/// - <= 10,000 取整到 1,000
/// - <= 50,000 取整到 5,000
/// - 其余取整到 10,000
///
/// 结果超出 u64 时返回 None
pub fn ceil_nice(value: u64) -> Option<u64> {
    let step = if value <= 10_000 {
        1_000
    } else if value <= 50_000 {
        5_000
    } else {
        10_000
    };
    value.div_ceil(step).checked_mul(step)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EauTierGenerator;

impl EauTierGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 生成升序去重的阶梯列表
    pub fn generate(&self, base_eau: u64) -> EngineResult<Vec<u64>> {
        if base_eau == 0 {
            return Err(EngineError::InvalidInput("基准EAU必须大于0".to_string()));
        }

        let mut tiers: BTreeSet<u64> = STANDARD_LADDER.iter().copied().collect();
        tiers.insert(base_eau);

        if base_eau > MULTIPLE_TIER_THRESHOLD {
            for m in MULTIPLES {
                let tier = base_eau
                    .checked_mul(m)
                    .and_then(ceil_nice)
                    .ok_or_else(|| {
                        EngineError::InvalidInput(format!("基准EAU过大: {}", base_eau))
                    })?;
                tiers.insert(tier);
            }
        }

        Ok(tiers.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_base_uses_ladder_only() {
        let tiers = EauTierGenerator::new().generate(1000).unwrap();
        assert_eq!(tiers, vec![1000, 5000, 10000, 20000, 50000, 100000]);
    }

    #[test]
    fn test_base_above_threshold_adds_multiples() {
        let tiers = EauTierGenerator::new().generate(3000).unwrap();
        for expected in [3000, 6000, 15000, 30000, 5000, 10000, 20000, 50000, 100000] {
            assert!(tiers.contains(&expected), "missing {}", expected);
        }
        assert!(tiers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let tiers = EauTierGenerator::new().generate(2000).unwrap();
        assert_eq!(tiers, vec![2000, 5000, 10000, 20000, 50000, 100000]);
    }

    #[test]
    fn test_ceil_nice_steps() {
        assert_eq!(ceil_nice(6_001), Some(7_000));
        assert_eq!(ceil_nice(10_000), Some(10_000));
        assert_eq!(ceil_nice(12_345), Some(15_000));
        assert_eq!(ceil_nice(50_000), Some(50_000));
        assert_eq!(ceil_nice(123_456), Some(130_000));
        assert_eq!(ceil_nice(u64::MAX - 1), None);
    }

    #[test]
    fn test_huge_base_rejected_instead_of_overflowing() {
        for base in [u64::MAX / 2, u64::MAX / 3, u64::MAX] {
            assert!(matches!(
                EauTierGenerator::new().generate(base),
                Err(EngineError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_zero_base_rejected() {
        assert!(matches!(
            EauTierGenerator::new().generate(0),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
