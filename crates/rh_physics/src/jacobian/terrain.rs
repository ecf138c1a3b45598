// crates/rh_physics/src/jacobian/terrain.rs

//! 地形跟随网格的重力分量
//!
//! 侧向面上的重力分解为沿坡分量 `g_s` 与法向分量 `g_c`，
//! 面项的迎风判据为 `(Δp/Δx)·g_c − g_s`。

use rh_config::SlopeUpwindFormulation;

use crate::numerics::means::arithmetic_mean;

/// 侧向面上的重力分量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityPair {
    /// 沿坡分量
    pub along: f64,
    /// 法向分量
    pub normal: f64,
}

impl GravityPair {
    /// 平坦地形
    pub const fn flat(gravity: f64) -> Self {
        Self {
            along: 0.0,
            normal: gravity,
        }
    }
}

#[inline]
fn sine_cosine(gravity: f64, slope: f64) -> (f64, f64) {
    let angle = slope.atan();
    (gravity * angle.sin(), gravity * angle.cos())
}

/// 面两侧单元坡度为 `own`、`neighbor` 时的重力分量
pub fn gravity_pair(formulation: SlopeUpwindFormulation, gravity: f64, own: f64, neighbor: f64) -> GravityPair {
    match formulation {
        SlopeUpwindFormulation::Original => {
            let (s0, c0) = sine_cosine(gravity, own);
            let (s1, c1) = sine_cosine(gravity, neighbor);
            GravityPair {
                along: arithmetic_mean(s0, s1),
                normal: arithmetic_mean(c0, c1),
            }
        }
        SlopeUpwindFormulation::UpwindSine => {
            let (along, normal) = sine_cosine(gravity, own);
            GravityPair { along, normal }
        }
        SlopeUpwindFormulation::Upwind => GravityPair {
            along: own,
            normal: 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_terrain() {
        for f in SlopeUpwindFormulation::all() {
            let pair = gravity_pair(f, 9.8, 0.0, 0.0);
            assert!(pair.along.abs() < 1e-14);
        }
        let pair = gravity_pair(SlopeUpwindFormulation::Original, 9.8, 0.0, 0.0);
        assert_eq!(pair, GravityPair::flat(9.8));
    }

    #[test]
    fn test_formulations_differ() {
        let g = 1.0;
        let original = gravity_pair(SlopeUpwindFormulation::Original, g, 1.0, 0.0);
        let sine = gravity_pair(SlopeUpwindFormulation::UpwindSine, g, 1.0, 0.0);
        let upwind = gravity_pair(SlopeUpwindFormulation::Upwind, g, 1.0, 0.0);

        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!((sine.along - half).abs() < 1e-14);
        assert!((sine.normal - half).abs() < 1e-14);
        assert!((original.along - 0.5 * half).abs() < 1e-14);
        assert!((original.normal - 0.5 * (half + 1.0)).abs() < 1e-14);
        assert_eq!(upwind, GravityPair { along: 1.0, normal: 1.0 });
    }
}
