// crates/rh_foundation/src/float.rs

//! 数值常量与安全浮点工具
//!
//! 组装过程中的除零、负数开方和零坡度等边界情况统一在这里处理。

// ============================================================================
// 数值常量
// ============================================================================

/// 默认的比较容差
pub const DEFAULT_EPSILON: f64 = 1e-14;

/// 安全除法的分母阈值
pub const SAFE_DIV_EPSILON: f64 = 1e-14;

// ============================================================================
// 辅助函数
// ============================================================================

/// 安全除法
#[inline]
pub fn safe_div(a: f64, b: f64, fallback: f64) -> f64 {
    if b.abs() < SAFE_DIV_EPSILON {
        fallback
    } else {
        let result = a / b;
        if result.is_finite() {
            result
        } else {
            fallback
        }
    }
}

/// 安全平方根
#[inline]
pub fn safe_sqrt(x: f64) -> f64 {
    x.max(0.0).sqrt()
}

/// 正部 `max(x, 0)`
#[inline]
pub fn positive_part(x: f64) -> f64 {
    x.max(0.0)
}

/// 阶跃函数，`x > 0` 时为 1，否则为 0
#[inline]
pub fn heaviside(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// 以 `floor` 为下限的幅值
///
/// 用于坡度模长等出现在分母中的量，保证结果不小于 `floor`。
#[inline]
pub fn floor_magnitude(x: f64, floor: f64) -> f64 {
    let m = x.abs();
    if m < floor {
        floor
    } else {
        m
    }
}

/// 检查浮点数是否有效（有限）
#[inline]
pub fn is_valid_f64(x: f64) -> bool {
    x.is_finite()
}

/// 相对/绝对混合容差比较
#[inline]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tol * scale
}
