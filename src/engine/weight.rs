// ==========================================
// 挤压报价系统 - 单件重量计算
// ==========================================
// 输入: 截面积(in²) 或 每英尺重量(lb/ft) 二选一 + 成品长度(in) + 密度(lb/in³)
// 输出: 单件重量 (lb), 不做中间取整
// ==========================================

use crate::engine::error::{EngineError, EngineResult};

/// 几何输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// 截面积 (in²)
    Area(f64),
    /// 每英尺重量 (lb/ft)
    WeightPerFoot(f64),
}

impl Geometry {
    /// 从可选字段构造几何输入, 两者必须恰好给出一个
    pub fn from_options(area_in2: Option<f64>, weight_lb_per_ft: Option<f64>) -> EngineResult<Self> {
        let geometry = match (area_in2, weight_lb_per_ft) {
            (Some(a), None) => Geometry::Area(a),
            (None, Some(w)) => Geometry::WeightPerFoot(w),
            (Some(_), Some(_)) => {
                return Err(EngineError::InvalidInput(
                    "截面积与每英尺重量只能提供一个".to_string(),
                ))
            }
            (None, None) => {
                return Err(EngineError::InvalidInput(
                    "必须提供截面积或每英尺重量".to_string(),
                ))
            }
        };

        let (field, value) = match geometry {
            Geometry::Area(v) => ("area_in2", v),
            Geometry::WeightPerFoot(v) => ("weight_lb_per_ft", v),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "{} 必须为正数, 实际为 {}",
                field, value
            )));
        }
        Ok(geometry)
    }
}

// ==========================================
// WeightCalculator - 单件重量计算器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightCalculator;

impl WeightCalculator {
    pub fn new() -> Self {
        Self
    }

    /// 计算单件重量
    ///
    /// - 截面积模式: area × length × density (要求 density > 0)
    /// - 每英尺重量模式: wpf × (length / 12)
    pub fn weight_per_piece(
        &self,
        geometry: Geometry,
        finished_length_in: f64,
        density_lb_in3: f64,
    ) -> EngineResult<f64> {
        if !finished_length_in.is_finite() || finished_length_in <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "finished_length_in 必须为正数, 实际为 {}",
                finished_length_in
            )));
        }

        match geometry {
            Geometry::Area(area) => {
                if !density_lb_in3.is_finite() || density_lb_in3 <= 0.0 {
                    return Err(EngineError::InvalidInput(format!(
                        "截面积模式要求密度为正数, 实际为 {}",
                        density_lb_in3
                    )));
                }
                Ok(area * finished_length_in * density_lb_in3)
            }
            Geometry::WeightPerFoot(wpf) => Ok(wpf * (finished_length_in / 12.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_area_mode() {
        let calc = WeightCalculator::new();
        let w = calc
            .weight_per_piece(Geometry::Area(0.2), 48.0, 0.035)
            .unwrap();
        assert!(approx(w, 0.336));
    }

    #[test]
    fn test_weight_per_foot_mode_ignores_density() {
        let calc = WeightCalculator::new();
        let w = calc
            .weight_per_piece(Geometry::WeightPerFoot(1.5), 96.0, 0.0)
            .unwrap();
        assert!(approx(w, 12.0));
    }

    #[test]
    fn test_geometry_requires_exactly_one() {
        assert!(matches!(
            Geometry::from_options(Some(0.2), Some(1.0)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            Geometry::from_options(None, None),
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(
            Geometry::from_options(None, Some(1.0)).unwrap(),
            Geometry::WeightPerFoot(1.0)
        );
    }

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        assert!(Geometry::from_options(Some(0.0), None).is_err());
        assert!(Geometry::from_options(Some(-1.0), None).is_err());
        assert!(Geometry::from_options(None, Some(f64::NAN)).is_err());
        assert!(Geometry::from_options(Some(f64::INFINITY), None).is_err());

        let calc = WeightCalculator::new();
        assert!(calc.weight_per_piece(Geometry::Area(0.2), 0.0, 0.1).is_err());
        assert!(calc.weight_per_piece(Geometry::Area(0.2), 12.0, 0.0).is_err());
    }
}
