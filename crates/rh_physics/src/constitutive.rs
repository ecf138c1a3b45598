// crates/rh_physics/src/constitutive.rs

//! 本构关系接口
//!
//! 组装器只通过 trait 消费密度、饱和度与相对渗透率，
//! 每个关系同时返回函数值及其对压力的导数。
//! 这里提供几种简单实现，供测试与演示使用。

use std::fmt;

/// 本构关系的函数值与对压力的导数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LawValue {
    /// 函数值
    pub value: f64,
    /// 对压力的导数
    pub derivative: f64,
}

impl LawValue {
    /// 创建
    #[inline]
    pub const fn new(value: f64, derivative: f64) -> Self {
        Self { value, derivative }
    }

    /// 导数为零的常量
    #[inline]
    pub const fn constant(value: f64) -> Self {
        Self::new(value, 0.0)
    }
}

// ============================================================
// Trait 定义
// ============================================================

/// 流体密度 ρ(p)
pub trait DensityLaw: Send + Sync {
    /// 计算密度与导数
    fn density(&self, pressure: f64) -> LawValue;
}

/// 饱和度 S(p)
pub trait SaturationLaw: Send + Sync {
    /// 计算饱和度与导数
    fn saturation(&self, pressure: f64, density: f64, gravity: f64) -> LawValue;
}

/// 相对渗透率 kr(p)
pub trait RelPermLaw: Send + Sync {
    /// 计算相对渗透率与导数
    fn rel_perm(&self, pressure: f64, density: f64, gravity: f64) -> LawValue;
}

// ============================================================
// 密度
// ============================================================

/// 常密度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantDensity(pub f64);

impl Default for ConstantDensity {
    fn default() -> Self {
        Self(1.0)
    }
}

impl DensityLaw for ConstantDensity {
    fn density(&self, _pressure: f64) -> LawValue {
        LawValue::constant(self.0)
    }
}

/// 弱可压缩密度 `ρ = ρ0·exp(c·p)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressibleDensity {
    /// 参考密度
    pub reference: f64,
    /// 压缩系数
    pub compressibility: f64,
}

impl DensityLaw for CompressibleDensity {
    fn density(&self, pressure: f64) -> LawValue {
        let rho = self.reference * (self.compressibility * pressure).exp();
        LawValue::new(rho, self.compressibility * rho)
    }
}

// ============================================================
// 饱和度
// ============================================================

/// 常饱和度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSaturation(pub f64);

impl Default for ConstantSaturation {
    fn default() -> Self {
        Self(1.0)
    }
}

impl SaturationLaw for ConstantSaturation {
    fn saturation(&self, _pressure: f64, _density: f64, _gravity: f64) -> LawValue {
        LawValue::constant(self.0)
    }
}

/// 指数型饱和度 `S = Sr + (1 - Sr)·exp(α·min(p, 0))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSaturation {
    /// 形状参数 α
    pub alpha: f64,
    /// 残余饱和度
    pub residual: f64,
}

impl SaturationLaw for ExponentialSaturation {
    fn saturation(&self, pressure: f64, _density: f64, _gravity: f64) -> LawValue {
        if pressure >= 0.0 {
            return LawValue::constant(1.0);
        }
        let e = (self.alpha * pressure).exp();
        let span = 1.0 - self.residual;
        LawValue::new(self.residual + span * e, span * self.alpha * e)
    }
}

// ============================================================
// 相对渗透率
// ============================================================

/// 常相对渗透率
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRelPerm(pub f64);

impl Default for ConstantRelPerm {
    fn default() -> Self {
        Self(1.0)
    }
}

impl RelPermLaw for ConstantRelPerm {
    fn rel_perm(&self, _pressure: f64, _density: f64, _gravity: f64) -> LawValue {
        LawValue::constant(self.0)
    }
}

/// Gardner 相对渗透率 `kr = exp(α·min(p, 0))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GardnerRelPerm {
    /// 形状参数 α
    pub alpha: f64,
}

impl RelPermLaw for GardnerRelPerm {
    fn rel_perm(&self, pressure: f64, _density: f64, _gravity: f64) -> LawValue {
        if pressure >= 0.0 {
            return LawValue::constant(1.0);
        }
        let kr = (self.alpha * pressure).exp();
        LawValue::new(kr, self.alpha * kr)
    }
}

// ============================================================
// 组合
// ============================================================

/// 组装器持有的一组本构关系
pub struct ConstitutiveLaws {
    /// 密度
    pub density: Box<dyn DensityLaw>,
    /// 饱和度
    pub saturation: Box<dyn SaturationLaw>,
    /// 相对渗透率
    pub rel_perm: Box<dyn RelPermLaw>,
}

impl ConstitutiveLaws {
    /// 创建
    pub fn new(
        density: impl DensityLaw + 'static,
        saturation: impl SaturationLaw + 'static,
        rel_perm: impl RelPermLaw + 'static,
    ) -> Self {
        Self {
            density: Box::new(density),
            saturation: Box::new(saturation),
            rel_perm: Box::new(rel_perm),
        }
    }
}

impl Default for ConstitutiveLaws {
    /// 单位密度、完全饱和、单位相对渗透率
    fn default() -> Self {
        Self::new(
            ConstantDensity::default(),
            ConstantSaturation::default(),
            ConstantRelPerm::default(),
        )
    }
}

impl fmt::Debug for ConstitutiveLaws {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstitutiveLaws").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite_difference(f: impl Fn(f64) -> f64, p: f64) -> f64 {
        let h = 1e-6;
        (f(p + h) - f(p - h)) / (2.0 * h)
    }

    #[test]
    fn test_compressible_density_derivative() {
        let law = CompressibleDensity {
            reference: 1000.0,
            compressibility: 1e-4,
        };
        let v = law.density(2.0);
        let fd = finite_difference(|p| law.density(p).value, 2.0);
        assert!((v.derivative - fd).abs() < 1e-6);
    }

    #[test]
    fn test_exponential_saturation() {
        let law = ExponentialSaturation {
            alpha: 2.0,
            residual: 0.1,
        };
        assert_eq!(law.saturation(0.5, 1.0, 1.0), LawValue::constant(1.0));
        let v = law.saturation(-0.3, 1.0, 1.0);
        assert!(v.value > 0.1 && v.value < 1.0);
        let fd = finite_difference(|p| law.saturation(p, 1.0, 1.0).value, -0.3);
        assert!((v.derivative - fd).abs() < 1e-6);
    }

    #[test]
    fn test_gardner_rel_perm() {
        let law = GardnerRelPerm { alpha: 1.5 };
        assert_eq!(law.rel_perm(0.0, 1.0, 1.0).value, 1.0);
        let v = law.rel_perm(-1.0, 1.0, 1.0);
        assert!((v.value - (-1.5f64).exp()).abs() < 1e-14);
        assert!((v.derivative - 1.5 * v.value).abs() < 1e-14);
    }

    #[test]
    fn test_default_laws_are_constant() {
        let laws = ConstitutiveLaws::default();
        assert_eq!(laws.density.density(-3.0), LawValue::constant(1.0));
        assert_eq!(laws.saturation.saturation(-3.0, 1.0, 1.0).derivative, 0.0);
        assert_eq!(laws.rel_perm.rel_perm(-3.0, 1.0, 1.0).value, 1.0);
    }
}
