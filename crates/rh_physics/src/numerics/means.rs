// crates/rh_physics/src/numerics/means.rs

//! 面系数的平均方式
//!
//! | 函数 | 定义 |
//! |------|------|
//! | [`harmonic_mean`] | `2ab/(a+b)`，`a+b = 0` 时为 0 |
//! | [`harmonic_mean_dz`] | 按层厚 `c, d` 加权的调和平均 `(c+d)ab/(bc+ad)` |
//! | [`upstream_mean`] | `a - b >= 0` 取 `c`，否则取 `d` |
//! | [`arithmetic_mean`] | `(a+b)/2` |

/// 调和平均，分母为零时返回 0
#[inline]
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum != 0.0 {
        2.0 * a * b / sum
    } else {
        0.0
    }
}

/// 按层厚加权的调和平均
///
/// `a, b` 为两单元的渗透率，`c, d` 为对应的层厚乘子；
/// 等价于两段串联介质的等效传导率。
#[inline]
pub fn harmonic_mean_dz(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let denom = c * b + d * a;
    if denom != 0.0 {
        (c + d) * a * b / denom
    } else {
        0.0
    }
}

/// 迎风选择：势差 `a - b` 非负时取低侧值 `c`，否则取高侧值 `d`
///
/// 势差恰为零时取 `c`。
#[inline]
pub fn upstream_mean(a: f64, b: f64, c: f64, d: f64) -> f64 {
    if a - b >= 0.0 {
        c
    } else {
        d
    }
}

/// 算术平均
#[inline]
pub fn arithmetic_mean(a: f64, b: f64) -> f64 {
    0.5 * (a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmonic_mean_identity() {
        for a in [1e-12, 0.3, 1.0, 7.5, 1e8] {
            assert!((harmonic_mean(a, a) - a).abs() <= 1e-12 * a);
        }
    }

    #[test]
    fn test_harmonic_mean_bounds() {
        let samples = [0.01, 0.5, 1.0, 3.0, 250.0];
        for &a in &samples {
            for &b in &samples {
                let h = harmonic_mean(a, b);
                assert!(h >= a.min(b) - 1e-12);
                assert!(h <= arithmetic_mean(a, b) + 1e-12);
            }
        }
    }

    #[test]
    fn test_harmonic_mean_monotone() {
        let mut prev = 0.0;
        for step in 1..50 {
            let b = step as f64 * 0.2;
            let h = harmonic_mean(2.0, b);
            assert!(h > prev);
            prev = h;
        }
    }

    #[test]
    fn test_harmonic_mean_zero_guard() {
        assert_eq!(harmonic_mean(0.0, 0.0), 0.0);
        assert_eq!(harmonic_mean(0.0, 5.0), 0.0);
        assert_eq!(harmonic_mean_dz(0.0, 0.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_harmonic_mean_dz_reduces_to_harmonic() {
        assert!((harmonic_mean_dz(2.0, 6.0, 1.0, 1.0) - harmonic_mean(2.0, 6.0)).abs() < 1e-14);
        // 串联：厚度 1 和 3，渗透率 1 和 3 => 等效 (1+3)/(1/1+3/3) = 2
        assert!((harmonic_mean_dz(1.0, 3.0, 1.0, 3.0) - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_upstream_mean_selection() {
        assert_eq!(upstream_mean(2.0, 1.0, 10.0, 20.0), 10.0);
        assert_eq!(upstream_mean(1.0, 2.0, 10.0, 20.0), 20.0);
        // 势差为零取低侧
        assert_eq!(upstream_mean(1.5, 1.5, 10.0, 20.0), 10.0);
    }
}
