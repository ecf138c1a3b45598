// crates/rh_physics/src/boundary/value.rs

//! 边界给定值来源
//!
//! 给定值可以是常数、分段线性时间序列，或按参考点换算的静水压力。
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::boundary::{BcValue, ExtrapolationMode, TimeSeries};
//!
//! let series = TimeSeries::new(vec![0.0, 10.0], vec![-1.0, 0.0])
//!     .unwrap()
//!     .with_extrapolation(ExtrapolationMode::Clamp);
//! let value = BcValue::Series(series);
//! assert!((value.evaluate(5.0, 0.0, 1.0) + 0.5).abs() < 1e-12);
//! assert_eq!(value.evaluate(20.0, 0.0, 1.0), 0.0);
//! ```

use serde::{Deserialize, Serialize};

use super::types::BoundaryError;

// ============================================================
// 时间序列
// ============================================================

/// 外推模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationMode {
    /// 超出范围时返回端点值
    #[default]
    Clamp,

    /// 使用端点处两点斜率线性外推
    Linear,

    /// 周期重复
    Cyclic,
}

/// 分段线性时间序列
///
/// 时间严格单调递增，时间与值数组等长且非空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
    #[serde(default)]
    extrapolation: ExtrapolationMode,
}

impl TimeSeries {
    /// 从时间和值数组创建
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self, BoundaryError> {
        if times.len() != values.len() {
            return Err(BoundaryError::InvalidSeries(format!(
                "时间与值长度不同: {} vs {}",
                times.len(),
                values.len()
            )));
        }
        if times.is_empty() {
            return Err(BoundaryError::InvalidSeries("时间序列为空".into()));
        }
        if times.iter().chain(&values).any(|v| !v.is_finite()) {
            return Err(BoundaryError::InvalidSeries("包含非有限数".into()));
        }
        if let Some(w) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(BoundaryError::InvalidSeries(format!(
                "时间必须严格递增: times[{}]={} >= times[{}]={}",
                w,
                times[w],
                w + 1,
                times[w + 1]
            )));
        }
        Ok(Self {
            times,
            values,
            extrapolation: ExtrapolationMode::Clamp,
        })
    }

    /// 从 (时间, 值) 点对创建
    pub fn from_points(points: Vec<(f64, f64)>) -> Result<Self, BoundaryError> {
        let (times, values) = points.into_iter().unzip();
        Self::new(times, values)
    }

    /// 设置外推模式
    pub fn with_extrapolation(mut self, mode: ExtrapolationMode) -> Self {
        self.extrapolation = mode;
        self
    }

    /// 外推模式
    pub fn extrapolation(&self) -> ExtrapolationMode {
        self.extrapolation
    }

    /// 时间范围
    pub fn time_range(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// 数据点数量
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// 是否为空（构造保证非空）
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// 时刻 `t` 的值
    pub fn value_at(&self, t: f64) -> f64 {
        let (t0, t1) = self.time_range();
        if t >= t0 && t <= t1 {
            return self.interpolate(t);
        }
        let n = self.times.len();
        match self.extrapolation {
            ExtrapolationMode::Clamp => {
                if t < t0 {
                    self.values[0]
                } else {
                    self.values[n - 1]
                }
            }
            ExtrapolationMode::Cyclic => {
                let period = t1 - t0;
                if period <= 0.0 {
                    return self.values[0];
                }
                self.interpolate(t0 + (t - t0).rem_euclid(period))
            }
            ExtrapolationMode::Linear => {
                if n < 2 {
                    return self.values[0];
                }
                if t < t0 {
                    let slope = (self.values[1] - self.values[0]) / (self.times[1] - t0);
                    self.values[0] + slope * (t - t0)
                } else {
                    let slope =
                        (self.values[n - 1] - self.values[n - 2]) / (t1 - self.times[n - 2]);
                    self.values[n - 1] + slope * (t - t1)
                }
            }
        }
    }

    fn interpolate(&self, t: f64) -> f64 {
        // 第一个大于 t 的时间点
        let hi = self.times.partition_point(|&x| x <= t);
        if hi == 0 {
            return self.values[0];
        }
        if hi >= self.times.len() {
            return self.values[self.times.len() - 1];
        }
        let lo = hi - 1;
        let w = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
        self.values[lo] + w * (self.values[hi] - self.values[lo])
    }
}

// ============================================================
// 给定值
// ============================================================

/// 边界给定值来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BcValue {
    /// 常数
    Constant(f64),

    /// 时间序列
    Series(TimeSeries),

    /// 静水压力 `p = p_ref - g·(z - z_ref)`（单位密度）
    Hydrostatic {
        /// 参考压力
        reference_pressure: f64,
        /// 参考高程
        reference_elevation: f64,
    },
}

impl Default for BcValue {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl BcValue {
    /// 在时刻 `time`、高程 `elevation` 处求值
    pub fn evaluate(&self, time: f64, elevation: f64, gravity: f64) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Series(series) => series.value_at(time),
            Self::Hydrostatic {
                reference_pressure,
                reference_elevation,
            } => reference_pressure - gravity * (elevation - reference_elevation),
        }
    }

    /// 是否随位置变化
    pub fn is_spatially_varying(&self) -> bool {
        matches!(self, Self::Hydrostatic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> TimeSeries {
        TimeSeries::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 0.0]).unwrap()
    }

    #[test]
    fn test_interpolation() {
        let s = ramp();
        assert!((s.value_at(0.5) - 1.0).abs() < 1e-12);
        assert!((s.value_at(2.0) - 1.0).abs() < 1e-12);
        assert_eq!(s.value_at(3.0), 0.0);
        assert_eq!(s.value_at(1.0), 2.0);
    }

    #[test]
    fn test_extrapolation_modes() {
        let clamp = ramp();
        assert_eq!(clamp.value_at(-1.0), 0.0);
        assert_eq!(clamp.value_at(10.0), 0.0);

        let cyclic = ramp().with_extrapolation(ExtrapolationMode::Cyclic);
        assert!((cyclic.value_at(3.5) - 1.0).abs() < 1e-12);

        let linear = ramp().with_extrapolation(ExtrapolationMode::Linear);
        assert!((linear.value_at(-1.0) + 2.0).abs() < 1e-12);
        assert!((linear.value_at(4.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_series() {
        assert!(TimeSeries::new(vec![], vec![]).is_err());
        assert!(TimeSeries::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(TimeSeries::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(TimeSeries::from_points(vec![(0.0, f64::NAN)]).is_err());
    }

    #[test]
    fn test_hydrostatic_value() {
        let v = BcValue::Hydrostatic {
            reference_pressure: 2.0,
            reference_elevation: 0.0,
        };
        assert!((v.evaluate(0.0, 1.5, 1.0) - 0.5).abs() < 1e-12);
        assert!(v.is_spatially_varying());
        assert!(!BcValue::Constant(1.0).is_spatially_varying());
    }
}
