// crates/rh_foundation/src/error.rs

//! 错误处理模块，定义基础层统一错误类型
//!
//! 提供 `RhError` 枚举和 `RhResult` 类型别名。
//!
//! # 设计原则
//!
//! 1. **层次化**: 基础层只定义网格与数据布局错误，组装相关错误在 rh_physics 中定义
//! 2. **易用性**: 提供便捷的构造方法
//!
//! # 示例
//!
//! ```
//! use rh_foundation::error::{RhError, RhResult};
//!
//! fn check_spacing(dx: f64) -> RhResult<()> {
//!     if dx <= 0.0 {
//!         return Err(RhError::invalid_grid("网格间距必须为正"));
//!     }
//!     Ok(())
//! }
//! assert!(check_spacing(-1.0).is_err());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type RhResult<T> = Result<T, RhError>;

/// 基础层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RhError {
    // ========================================================================
    // 输入数据错误
    // ========================================================================
    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    // ========================================================================
    // 网格与布局错误
    // ========================================================================
    /// 无效网格
    #[error("无效的网格: {message}")]
    InvalidGrid {
        /// 具体错误信息
        message: String,
    },

    /// 坐标超出索引盒
    #[error("坐标 ({i}, {j}, {k}) 超出索引盒")]
    OutOfBox {
        /// x 方向全局坐标
        i: i32,
        /// y 方向全局坐标
        j: i32,
        /// z 方向全局坐标
        k: i32,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl RhError {
    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 无效网格
    pub fn invalid_grid(message: impl Into<String>) -> Self {
        Self::InvalidGrid {
            message: message.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 是否为布局类错误（尺寸不符或坐标越界）
    pub fn is_layout_error(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. } | Self::OutOfBox { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RhError::size_mismatch("pressure", 10, 8);
        let text = err.to_string();
        assert!(text.contains("pressure"));
        assert!(text.contains("10"));
    }

    #[test]
    fn test_layout_classification() {
        assert!(RhError::OutOfBox { i: 1, j: 2, k: 3 }.is_layout_error());
        assert!(!RhError::invalid_grid("nx = 0").is_layout_error());
    }

    #[test]
    fn test_out_of_range_display() {
        let err = RhError::out_of_range("dx", -1.0, 0.0, f64::MAX);
        assert!(err.to_string().contains("dx=-1"));
    }
}
