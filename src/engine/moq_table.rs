// ==========================================
// 挤压报价系统 - 阶梯折扣与 MOQ 表
// ==========================================
// factor = clamp((B/E)^k, f_min, 1.0)
// price  = P_base × factor,  gp = price − C_mat
// moq    = max(moq_floor, ceil((setup_charge + gp_min_order) / gp))
// ==========================================
// 红线: 任何阶梯单价不得高于天花板价
// 红线: 每个输入 EAU 恰好输出一个阶梯, 顺序与输入一致
// ==========================================

use crate::domain::quote::{EauMoqConfig, EauMoqTier};
use crate::engine::error::{EngineError, EngineResult};

pub const NOTE_MARGIN_TOO_LOW: &str = "Tier not allowed: margin too low at this price.";
pub const NOTE_MOQ_EXCEEDS_EAU: &str = "MOQ exceeds EAU assumption.";

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn floor_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).floor() / scale
}

/// 单价取整到 6 位小数, 取整结果不得超过天花板价
fn round_price_capped(price: f64, ceiling: f64) -> f64 {
    let rounded = round_to(price, 6);
    if rounded <= ceiling {
        rounded
    } else {
        floor_to(price, 6).min(ceiling)
    }
}

/// 校验阶梯/MOQ 参数
pub fn validate_config(config: &EauMoqConfig) -> EngineResult<()> {
    if !config.k.is_finite() || config.k < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "eau_moq.k 必须为非负数, 实际为 {}",
            config.k
        )));
    }
    if !config.f_min.is_finite() || config.f_min <= 0.0 || config.f_min > 1.0 {
        return Err(EngineError::InvalidInput(format!(
            "eau_moq.f_min 必须在 (0, 1] 内, 实际为 {}",
            config.f_min
        )));
    }
    if !config.gp_min_order.is_finite() || config.gp_min_order < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "eau_moq.gp_min_order 不能为负, 实际为 {}",
            config.gp_min_order
        )));
    }
    if !config.setup_charge.is_finite() || config.setup_charge < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "eau_moq.setup_charge 不能为负, 实际为 {}",
            config.setup_charge
        )));
    }
    if config.moq_floor < 1 {
        return Err(EngineError::InvalidInput(
            "eau_moq.moq_floor 至少为 1".to_string(),
        ));
    }
    Ok(())
}

// ==========================================
// MoqTableBuilder
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct MoqTableBuilder;

impl MoqTableBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 构建阶梯表
    ///
    /// # 参数
    /// - ceiling_price: 天花板价 P_base
    /// - material_cost: 单件材料成本 C_mat
    /// - base_eau: 基准 EAU (B)
    /// - tiers: 待定价的 EAU 列表 (E)
    pub fn build(
        &self,
        ceiling_price: f64,
        material_cost: f64,
        base_eau: u64,
        tiers: &[u64],
        config: &EauMoqConfig,
    ) -> EngineResult<Vec<EauMoqTier>> {
        validate_config(config)?;
        if base_eau == 0 {
            return Err(EngineError::InvalidInput("基准EAU必须大于0".to_string()));
        }
        if let Some(zero) = tiers.iter().find(|&&e| e == 0) {
            return Err(EngineError::InvalidInput(format!("阶梯EAU必须大于0: {}", zero)));
        }

        let fixed_cost = config.setup_charge + config.gp_min_order;

        let table = tiers
            .iter()
            .map(|&eau| {
                let ratio = base_eau as f64 / eau as f64;
                let factor = ratio.powf(config.k).clamp(config.f_min, 1.0);

                let price = ceiling_price * factor;
                let gross_profit = price - material_cost;

                let (moq_pieces, notes) = if !gross_profit.is_finite() || gross_profit <= 0.0 {
                    (config.moq_floor, Some(NOTE_MARGIN_TOO_LOW.to_string()))
                } else {
                    let needed = (fixed_cost / gross_profit).ceil() as u64;
                    let moq = needed.max(config.moq_floor);
                    let notes = (moq > eau).then(|| NOTE_MOQ_EXCEEDS_EAU.to_string());
                    (moq, notes)
                };

                EauMoqTier {
                    eau,
                    factor: round_to(factor, 6),
                    discount_pct: round_to((1.0 - factor) * 100.0, 2),
                    price_per_piece: round_price_capped(price, ceiling_price),
                    gross_profit_per_piece: round_to(gross_profit, 6),
                    moq_pieces,
                    notes,
                }
            })
            .collect();

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(ceiling: f64, cost: f64, base: u64, tiers: &[u64]) -> Vec<EauMoqTier> {
        MoqTableBuilder::new()
            .build(ceiling, cost, base, tiers, &EauMoqConfig::default())
            .unwrap()
    }

    #[test]
    fn test_base_tier_has_no_discount() {
        let table = build(10.0, 4.0, 1000, &[1000]);
        assert_eq!(table[0].factor, 1.0);
        assert_eq!(table[0].discount_pct, 0.0);
        assert_eq!(table[0].price_per_piece, 10.0);
        // (250 + 500) / 6 = 125 → 下限 500
        assert_eq!(table[0].moq_pieces, 500);
        assert!(table[0].notes.is_none());
    }

    #[test]
    fn test_factor_clamped_between_f_min_and_one() {
        let tiers = [100, 1000, 5000, 100_000, 10_000_000];
        let table = build(10.0, 4.0, 1000, &tiers);
        assert_eq!(table.len(), tiers.len());
        for (tier, eau) in table.iter().zip(tiers) {
            assert_eq!(tier.eau, eau);
            assert!(tier.factor <= 1.0 && tier.factor >= 0.85);
            assert!(tier.price_per_piece <= 10.0);
            assert!(tier.moq_pieces >= 500);
        }
        // 低于基准的用量不加价
        assert_eq!(table[0].factor, 1.0);
        // 极大用量触底
        assert_eq!(table[4].factor, 0.85);
        assert_eq!(table[4].discount_pct, 15.0);
    }

    #[test]
    fn test_discount_matches_curve() {
        let table = build(10.0, 4.0, 1000, &[2_000]);
        let expected = 0.5f64.powf(0.08);
        assert!((table[0].factor - expected).abs() < 1e-6);
        assert!((table[0].discount_pct - (1.0 - expected) * 100.0).abs() < 0.006);
    }

    #[test]
    fn test_margin_too_low_still_reported() {
        let table = build(1.0, 2.0, 1000, &[1000, 5000]);
        assert_eq!(table.len(), 2);
        for tier in &table {
            assert_eq!(tier.moq_pieces, 500);
            assert_eq!(tier.notes.as_deref(), Some(NOTE_MARGIN_TOO_LOW));
            assert!(tier.gross_profit_per_piece < 0.0);
        }
    }

    #[test]
    fn test_moq_exceeds_eau_note() {
        // gp = 0.5 → moq = 1500 > 1000
        let table = build(1.0, 0.5, 1000, &[1000]);
        assert_eq!(table[0].moq_pieces, 1500);
        assert_eq!(table[0].notes.as_deref(), Some(NOTE_MOQ_EXCEEDS_EAU));
    }

    #[test]
    fn test_rounded_price_never_exceeds_ceiling() {
        let ceiling = 1.234_567_89;
        let table = build(ceiling, 0.1, 1000, &[1000]);
        assert!(table[0].price_per_piece <= ceiling);
        assert_eq!(table[0].price_per_piece, 1.234_567);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let builder = MoqTableBuilder::new();
        let bad = [
            EauMoqConfig { k: -0.1, ..Default::default() },
            EauMoqConfig { f_min: 0.0, ..Default::default() },
            EauMoqConfig { f_min: 1.5, ..Default::default() },
            EauMoqConfig { setup_charge: -1.0, ..Default::default() },
            EauMoqConfig { gp_min_order: f64::NAN, ..Default::default() },
            EauMoqConfig { moq_floor: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(
                builder.build(10.0, 4.0, 1000, &[1000], &config),
                Err(EngineError::InvalidInput(_))
            ));
        }
    }
}
