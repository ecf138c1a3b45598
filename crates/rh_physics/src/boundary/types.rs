// crates/rh_physics/src/boundary/types.rs

//! 边界条件类型定义
//!
//! - BoundaryKind: 边界类型枚举
//! - BoundaryCondition: 类型与取值来源
//! - BoundaryError: 边界片构建与取值错误

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value::BcValue;

// ============================================================
// 边界类型枚举
// ============================================================

/// 边界类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BoundaryKind {
    /// 给定通量（含零通量）
    #[default]
    Flux = 0,

    /// 给定压力
    ///
    /// 给定值同时写入界外幽灵压力，参与相对渗透率的迎风取值。
    Dirichlet = 1,

    /// 渗出面
    ///
    /// 顶面压力非负时以积水深度为出流。
    Seepage = 2,

    /// 通用坡面漫流
    ///
    /// 按配置选择简化形式、预热形式或完整漫流模型。
    Overland = 3,

    /// 运动波坡面漫流
    OverlandKinematic = 4,

    /// 扩散波坡面漫流
    OverlandDiffusive = 5,
}

impl BoundaryKind {
    /// 全部类型
    pub const ALL: [BoundaryKind; 6] = [
        Self::Flux,
        Self::Dirichlet,
        Self::Seepage,
        Self::Overland,
        Self::OverlandKinematic,
        Self::OverlandDiffusive,
    ];

    /// 是否属于坡面漫流族
    #[inline]
    pub fn is_overland_family(&self) -> bool {
        matches!(
            self,
            Self::Overland | Self::OverlandKinematic | Self::OverlandDiffusive
        )
    }

    /// 是否需要逐面的给定值
    #[inline]
    pub fn uses_face_values(&self) -> bool {
        matches!(self, Self::Dirichlet)
    }

    /// 从 u8 值转换
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_u8() == value)
    }

    /// 转换为 u8 值
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Flux => "Flux",
            Self::Dirichlet => "Dirichlet",
            Self::Seepage => "Seepage",
            Self::Overland => "Overland",
            Self::OverlandKinematic => "OverlandKinematic",
            Self::OverlandDiffusive => "OverlandDiffusive",
        };
        write!(f, "{}", name)
    }
}

// ============================================================
// 边界条件配置
// ============================================================

/// 边界条件：类型与给定值来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    /// 边界类型
    pub kind: BoundaryKind,
    /// 给定值（压力、通量或降雨强度，随类型而定）
    pub value: BcValue,
}

impl BoundaryCondition {
    /// 任意类型与取值
    pub fn new(kind: BoundaryKind, value: BcValue) -> Self {
        Self { kind, value }
    }

    /// 零通量
    ///
    /// # 示例
    /// ```
    /// use rh_physics::boundary::{BoundaryCondition, BoundaryKind};
    ///
    /// let bc = BoundaryCondition::no_flux();
    /// assert_eq!(bc.kind, BoundaryKind::Flux);
    /// ```
    pub fn no_flux() -> Self {
        Self::flux(BcValue::Constant(0.0))
    }

    /// 给定通量
    pub fn flux(value: BcValue) -> Self {
        Self::new(BoundaryKind::Flux, value)
    }

    /// 给定压力
    pub fn dirichlet(value: BcValue) -> Self {
        Self::new(BoundaryKind::Dirichlet, value)
    }

    /// 渗出面
    pub fn seepage() -> Self {
        Self::new(BoundaryKind::Seepage, BcValue::Constant(0.0))
    }

    /// 通用坡面漫流，`rain` 为降雨（负值为入流）
    pub fn overland(rain: BcValue) -> Self {
        Self::new(BoundaryKind::Overland, rain)
    }

    /// 运动波坡面漫流
    pub fn overland_kinematic(rain: BcValue) -> Self {
        Self::new(BoundaryKind::OverlandKinematic, rain)
    }

    /// 扩散波坡面漫流
    pub fn overland_diffusive(rain: BcValue) -> Self {
        Self::new(BoundaryKind::OverlandDiffusive, rain)
    }
}

// ============================================================
// 错误类型
// ============================================================

/// 边界条件错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundaryError {
    /// 边界片名称重复
    #[error("边界片名称重复: {0}")]
    DuplicatePatch(String),

    /// 找不到边界片
    #[error("未找到边界片: {0}")]
    PatchNotFound(String),

    /// 时间序列无效
    #[error("时间序列无效: {0}")]
    InvalidSeries(String),

    /// 给定值不是有限数
    #[error("边界片 {patch} 在 t={time} 的给定值无效: {value}")]
    InvalidValue {
        /// 边界片名称
        patch: String,
        /// 求值时间
        time: f64,
        /// 求得的值
        value: f64,
    },

    /// 边界片与网格不一致
    #[error("边界片 {patch} 与网格不一致: 期望 {expected} 个子网格，实际 {actual}")]
    LayoutMismatch {
        /// 边界片名称
        patch: String,
        /// 期望子网格数
        expected: usize,
        /// 实际子网格数
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_u8() {
        for kind in BoundaryKind::ALL {
            assert_eq!(BoundaryKind::from_u8(kind.as_u8()), Some(kind));
        }
        assert_eq!(BoundaryKind::from_u8(42), None);
    }

    #[test]
    fn test_overland_family() {
        assert!(BoundaryKind::Overland.is_overland_family());
        assert!(BoundaryKind::OverlandDiffusive.is_overland_family());
        assert!(!BoundaryKind::Seepage.is_overland_family());
        assert!(BoundaryKind::Dirichlet.uses_face_values());
    }

    #[test]
    fn test_condition_serde() {
        let bc = BoundaryCondition::dirichlet(BcValue::Constant(-1.5));
        let json = serde_json::to_string(&bc).unwrap();
        assert!(json.contains("dirichlet"));
        let back: BoundaryCondition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bc);
    }
}
