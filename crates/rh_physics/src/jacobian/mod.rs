// crates/rh_physics/src/jacobian/mod.rs

//! Richards 方程雅可比组装
//!
//! 本模块把一次非线性迭代的线性化拆成几个阶段：
//!
//! - [`subsurface`]: 储量项与 7 点模板的面项
//! - [`terrain`]: 地形跟随网格的重力分量
//! - [`decomposition`]: 从 J 抽取地表矩阵 JC、界外单位行
//! - [`evaluator`]: [`RichardsJacobian`]，按顺序驱动全部阶段与幽灵交换
//! - [`operator`]: [`JacobianPair`]，矩阵向量乘与 CSR 导出
//!
//! 边界行修正由 [`crate::boundary::dispatch`] 完成，坡面通量由 [`crate::overland`] 给出。

pub mod decomposition;
pub mod evaluator;
pub mod operator;
pub mod subsurface;
pub mod terrain;

pub use evaluator::RichardsJacobian;
pub use operator::JacobianPair;

use rh_config::{JacobianConfig, OverlandModel, SlopeUpwindFormulation};
use serde::{Deserialize, Serialize};

use crate::boundary::{BoundaryKind, BoundaryPatchSet};
use crate::fields::SubField;
use crate::grid::Subgrid;

// ============================================================
// 雅可比类型
// ============================================================

/// 雅可比的组装方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JacobianKind {
    /// 只有地下矩阵 J，坡面漫流按对角近似
    Simple,
    /// J 与地表矩阵 JC 分块
    OverlandFlow,
}

impl JacobianKind {
    /// 由配置与边界片决定
    ///
    /// 存在运动波或扩散波边界时总是分块；
    /// 通用坡面漫流边界只在启用解析雅可比时分块。
    pub fn resolve(config: &JacobianConfig, patches: &BoundaryPatchSet) -> Self {
        let explicit = patches.has_kind(BoundaryKind::OverlandKinematic)
            || patches.has_kind(BoundaryKind::OverlandDiffusive);
        let generic = config.use_jacobian && patches.has_kind(BoundaryKind::Overland);
        if explicit || generic {
            Self::OverlandFlow
        } else {
            Self::Simple
        }
    }

    /// 是否有地表矩阵
    #[inline]
    pub fn has_surface(self) -> bool {
        self == Self::OverlandFlow
    }
}

// ============================================================
// 组装参数与输入
// ============================================================

/// 一次组装的标量参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyParams {
    /// 时间步长
    pub dt: f64,
    /// 重力加速度
    pub gravity: f64,
    /// 黏度
    pub viscosity: f64,
    /// 组装方式
    pub kind: JacobianKind,
    /// 只存对称部分
    pub symmetric: bool,
    /// 地形跟随重力公式
    pub slope_upwind: SlopeUpwindFormulation,
    /// 通用坡面漫流边界使用的模型
    pub overland_model: OverlandModel,
    /// 起转模式
    pub spinup: bool,
    /// 起转阻尼 P1
    pub damp_p1: f64,
    /// 起转阻尼 P2
    pub damp_p2: f64,
    /// 坡度模长下限
    pub epsilon: f64,
}

impl AssemblyParams {
    /// 由配置、组装方式与本次的步长构造
    pub fn new(config: &JacobianConfig, kind: JacobianKind, dt: f64, symmetric: bool) -> Self {
        Self {
            dt,
            gravity: config.physics.gravity,
            viscosity: config.physics.viscosity,
            kind,
            symmetric,
            slope_upwind: config.terrain_following.slope_upwind_formulation,
            overland_model: config.overland.model,
            spinup: config.overland.spinup,
            damp_p1: config.overland.spinup_damp_p1,
            damp_p2: config.overland.spinup_damp_p2,
            epsilon: config.overland.epsilon,
        }
    }
}

/// 单个子网格上的单元量
///
/// `pressure` 已注入 Dirichlet 幽灵值；`density` 与 `saturation` 由原始压力求出，
/// 相对渗透率由注入后的压力求出。
#[derive(Debug, Clone, Copy)]
pub struct CellInputs<'a> {
    /// 所在子网格
    pub subgrid: &'a Subgrid,
    /// 压力
    pub pressure: &'a SubField,
    /// 密度
    pub density: &'a SubField,
    /// 密度导数
    pub d_density: &'a SubField,
    /// 相对渗透率
    pub rel_perm: &'a SubField,
    /// 相对渗透率导数
    pub d_rel_perm: &'a SubField,
    /// x 向渗透率
    pub perm_x: &'a SubField,
    /// y 向渗透率
    pub perm_y: &'a SubField,
    /// z 向渗透率
    pub perm_z: &'a SubField,
    /// 层厚乘子
    pub z_mult: &'a SubField,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BcValue, BoundaryCondition, PatchSide};
    use crate::grid::{DomainGeometry, Grid};

    fn patches_with(condition: BoundaryCondition) -> BoundaryPatchSet {
        let grid = Grid::uniform([2, 2, 2], [1.0, 1.0, 1.0]).unwrap();
        BoundaryPatchSet::builder()
            .side("top", PatchSide::Top, condition)
            .build(&grid, &DomainGeometry::full(&grid))
            .unwrap()
    }

    #[test]
    fn test_kind_resolution() {
        let mut config = JacobianConfig::default();
        let generic = patches_with(BoundaryCondition::overland(BcValue::Constant(0.0)));
        let kinematic = patches_with(BoundaryCondition::overland_kinematic(BcValue::Constant(0.0)));
        let flux = patches_with(BoundaryCondition::no_flux());

        assert_eq!(JacobianKind::resolve(&config, &generic), JacobianKind::Simple);
        assert_eq!(JacobianKind::resolve(&config, &kinematic), JacobianKind::OverlandFlow);

        config.use_jacobian = true;
        assert_eq!(JacobianKind::resolve(&config, &generic), JacobianKind::OverlandFlow);
        assert_eq!(JacobianKind::resolve(&config, &flux), JacobianKind::Simple);
        assert!(!JacobianKind::Simple.has_surface());
    }

    #[test]
    fn test_params_from_config() {
        let mut config = JacobianConfig::default();
        config.overland.spinup = true;
        config.overland.epsilon = 1e-3;
        let params = AssemblyParams::new(&config, JacobianKind::OverlandFlow, 0.5, true);
        assert_eq!(params.dt, 0.5);
        assert!(params.spinup);
        assert!(params.symmetric);
        assert_eq!(params.epsilon, 1e-3);
        assert_eq!(params.gravity, config.physics.gravity);
    }
}
