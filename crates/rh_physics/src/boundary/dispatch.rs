// crates/rh_physics/src/boundary/dispatch.rs

//! 按边界类型修正雅可比行
//!
//! 每种边界类型对应一个无状态的处理器（[`BoundaryRowHandler`]）。
//! 对每个边界片，组装器依次调用：
//!
//! 1. `prepare_ghost`：相对渗透率求值前写入幽灵压力（仅 Dirichlet）
//! 2. `strip_row`：把指向界外的槽位并入对角并清零
//! 3. `apply_boundary`：加上该类型自己的贡献
//! 4. `contribute_surface_coupling`：把顶面行搬到地表矩阵 JC（坡面漫流族）
//!
//! 行修正只作用于拥有面；坡面通量求值同时覆盖幽灵环上的面；
//! 幽灵压力按存储面写入，台阶处外侧单元落在存储区内的面也算在内。

use rh_config::OverlandModel;

use super::patch::{BoundaryFace, PatchFaces};
use super::types::BoundaryKind;
use crate::constitutive::DensityLaw;
use crate::fields::SubField;
use crate::jacobian::decomposition::{extract_surface_rows, LateralCoupling};
use crate::jacobian::{AssemblyParams, CellInputs, JacobianKind};
use crate::numerics::means::{arithmetic_mean, upstream_mean};
use crate::overland::{model_for, EvalMode, FaceConductance, OverlandInputs};
use crate::stencil::{StencilBlock, StencilSlot};

// ============================================================
// 上下文
// ============================================================

/// 行修正阶段的上下文（单个子网格）
pub struct RowContext<'a> {
    /// 单元量
    pub cells: &'a CellInputs<'a>,
    /// 地表量
    pub surface: &'a OverlandInputs<'a>,
    /// 组装参数
    pub params: &'a AssemblyParams,
    /// 密度关系，用于给定压力处的密度
    pub density_law: &'a dyn DensityLaw,
    /// 地下矩阵块
    pub j: &'a mut StencilBlock,
    /// 坡面通量导数
    pub overland: &'a mut SubField<FaceConductance>,
}

/// JC 抽取阶段的上下文（单个子网格）
pub struct CouplingContext<'a> {
    /// 单元量
    pub cells: &'a CellInputs<'a>,
    /// 地表量
    pub surface: &'a OverlandInputs<'a>,
    /// 组装参数
    pub params: &'a AssemblyParams,
    /// 已交换的坡面通量导数
    pub overland: &'a SubField<FaceConductance>,
    /// 地下矩阵块
    pub j: &'a mut StencilBlock,
    /// 地表矩阵块
    pub jc: &'a mut StencilBlock,
}

// ============================================================
// 处理器接口
// ============================================================

/// 一种边界类型的行修正
pub trait BoundaryRowHandler: Send + Sync {
    /// 处理的边界类型
    fn kind(&self) -> BoundaryKind;

    /// 写入界外幽灵压力
    fn prepare_ghost(&self, _pressure: &mut SubField, _faces: &PatchFaces, _values: &[f64]) {}

    /// 把指向界外的系数并入对角
    fn strip_row(&self, j: &mut StencilBlock, faces: &[BoundaryFace]) {
        for f in faces {
            let v = j.take(f.slot(), f.i, f.j, f.k);
            j.add(StencilSlot::Center, f.i, f.j, f.k, v);
        }
    }

    /// 边界类型自身的贡献
    fn apply_boundary(&self, ctx: &mut RowContext<'_>, faces: &PatchFaces, values: &[f64]);

    /// 地表耦合（JC 抽取）
    fn contribute_surface_coupling(&self, _ctx: &mut CouplingContext<'_>, _faces: &[BoundaryFace]) {}
}

/// 给定通量
#[derive(Debug, Clone, Copy, Default)]
pub struct FluxHandler;

/// 给定压力
#[derive(Debug, Clone, Copy, Default)]
pub struct DirichletHandler;

/// 渗出面
#[derive(Debug, Clone, Copy, Default)]
pub struct SeepageHandler;

/// 通用坡面漫流
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlandHandler;

/// 运动波坡面漫流
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlandKinematicHandler;

/// 扩散波坡面漫流
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlandDiffusiveHandler;

static FLUX: FluxHandler = FluxHandler;
static DIRICHLET: DirichletHandler = DirichletHandler;
static SEEPAGE: SeepageHandler = SeepageHandler;
static OVERLAND: OverlandHandler = OverlandHandler;
static OVERLAND_KINEMATIC: OverlandKinematicHandler = OverlandKinematicHandler;
static OVERLAND_DIFFUSIVE: OverlandDiffusiveHandler = OverlandDiffusiveHandler;

/// 边界类型对应的处理器
pub fn handler_for(kind: BoundaryKind) -> &'static dyn BoundaryRowHandler {
    match kind {
        BoundaryKind::Flux => &FLUX,
        BoundaryKind::Dirichlet => &DIRICHLET,
        BoundaryKind::Seepage => &SEEPAGE,
        BoundaryKind::Overland => &OVERLAND,
        BoundaryKind::OverlandKinematic => &OVERLAND_KINEMATIC,
        BoundaryKind::OverlandDiffusive => &OVERLAND_DIFFUSIVE,
    }
}

// ============================================================
// 各类型实现
// ============================================================

impl BoundaryRowHandler for FluxHandler {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Flux
    }

    fn apply_boundary(&self, _ctx: &mut RowContext<'_>, _faces: &PatchFaces, _values: &[f64]) {}
}

impl BoundaryRowHandler for DirichletHandler {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Dirichlet
    }

    fn prepare_ghost(&self, pressure: &mut SubField, faces: &PatchFaces, values: &[f64]) {
        for f in faces.storage() {
            let o = f.outside();
            if let Some(p) = pressure.try_get_mut(o.x, o.y, o.z) {
                *p = values[f.ival];
            }
        }
    }

    fn apply_boundary(&self, ctx: &mut RowContext<'_>, faces: &PatchFaces, values: &[f64]) {
        let c = ctx.cells;
        let s = c.subgrid;
        let (dx, dy, dz) = (s.dx, s.dy, s.dz);
        let (dt, g, mu) = (ctx.params.dt, ctx.params.gravity, ctx.params.viscosity);

        for f in faces.owned() {
            let (i, j, k) = (f.i, f.j, f.k);
            let value = values[f.ival];
            let den_d = ctx.density_law.density(value).value;

            let pc = c.pressure.get(i, j, k);
            let d = c.density.get(i, j, k);
            let dd = c.d_density.get(i, j, k);
            let rp = c.rel_perm.get(i, j, k);
            let prod = rp * d;
            let prod_der = c.d_rel_perm.get(i, j, k) * d + rp * dd;
            let zm = c.z_mult.get(i, j, k);

            let o = f.outside();
            let prod_val = c.rel_perm.get(o.x, o.y, o.z) * den_d;

            let lateral = |area: f64, h: f64, perm: f64| dt * area * zm * (2.0 / h) * perm / mu;
            let o_temp = match f.slot() {
                StencilSlot::West | StencilSlot::South => {
                    let (area, h, perm) = if f.slot() == StencilSlot::West {
                        (dy * dz, dx, c.perm_x.get(i, j, k))
                    } else {
                        (dx * dz, dy, c.perm_y.get(i, j, k))
                    };
                    lateral(area, h, perm)
                        * ((value - pc) * upstream_mean(value, pc, 0.0, prod_der)
                            - upstream_mean(value, pc, prod_val, prod))
                }
                StencilSlot::East | StencilSlot::North => {
                    let (area, h, perm) = if f.slot() == StencilSlot::East {
                        (dy * dz, dx, c.perm_x.get(i, j, k))
                    } else {
                        (dx * dz, dy, c.perm_y.get(i, j, k))
                    };
                    -lateral(area, h, perm)
                        * ((pc - value) * upstream_mean(pc, value, prod_der, 0.0)
                            + upstream_mean(pc, value, prod, prod_val))
                }
                StencilSlot::Lower | StencilSlot::Upper => {
                    let zm_up = c.z_mult.get(i, j, k + 1);
                    let coeff = dt * dx * dy * (2.0 / (dz * arithmetic_mean(zm, zm_up)))
                        * c.perm_z.get(i, j, k)
                        / mu;
                    let half = 0.5 * dz * zm;
                    if f.slot() == StencilSlot::Lower {
                        let lower = value - half * den_d * g;
                        let upper = pc + half * d * g;
                        coeff
                            * ((lower - upper) * upstream_mean(lower, upper, 0.0, prod_der)
                                + (-1.0 - g * half * dd) * upstream_mean(lower, upper, prod_val, prod))
                    } else {
                        let lower = pc - half * d * g;
                        let upper = value + half * den_d * g;
                        -coeff
                            * ((lower - upper) * upstream_mean(lower, upper, prod_der, 0.0)
                                + (1.0 - g * half * dd) * upstream_mean(lower, upper, prod, prod_val))
                    }
                }
                StencilSlot::Center => 0.0,
            };

            ctx.j.add(StencilSlot::Center, i, j, k, -o_temp);
        }
    }
}

/// 顶面压力非负时的积水出流项 `(V/dz)·dt`
fn ponding_penalty(ctx: &mut RowContext<'_>, faces: &[BoundaryFace]) {
    let s = ctx.cells.subgrid;
    let term = s.cell_volume() / s.dz * ctx.params.dt;
    for f in faces.iter().filter(|f| f.is_top()) {
        if ctx.cells.pressure.get(f.i, f.j, f.k) >= 0.0 {
            ctx.j.add(StencilSlot::Center, f.i, f.j, f.k, term);
        }
    }
}

impl BoundaryRowHandler for SeepageHandler {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Seepage
    }

    fn apply_boundary(&self, ctx: &mut RowContext<'_>, faces: &PatchFaces, _values: &[f64]) {
        ponding_penalty(ctx, faces.owned());
    }
}

impl BoundaryRowHandler for OverlandHandler {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::Overland
    }

    fn apply_boundary(&self, ctx: &mut RowContext<'_>, faces: &PatchFaces, _values: &[f64]) {
        match ctx.params.kind {
            JacobianKind::Simple => {
                let s = ctx.cells.subgrid;
                let vol = s.cell_volume();
                for f in faces.owned().iter().filter(|f| f.is_top()) {
                    let (i, j, k) = (f.i, f.j, f.k);
                    if ctx.cells.pressure.get(i, j, k) > 0.0 {
                        let zm = ctx.cells.z_mult.get(i, j, k);
                        let zm_up = ctx.cells.z_mult.get(i, j, k + 1);
                        let term = vol * zm / (s.dz * arithmetic_mean(zm, zm_up)) * (ctx.params.dt + 1.0);
                        ctx.j.add(StencilSlot::Center, i, j, k, term);
                    }
                }
            }
            JacobianKind::OverlandFlow if ctx.params.spinup => ponding_penalty(ctx, faces.owned()),
            JacobianKind::OverlandFlow => {
                model_for(ctx.params.overland_model).evaluate(
                    ctx.surface,
                    faces,
                    EvalMode::Derivative,
                    ctx.overland,
                );
            }
        }
    }

    fn contribute_surface_coupling(&self, ctx: &mut CouplingContext<'_>, faces: &[BoundaryFace]) {
        let lateral = match ctx.params.overland_model {
            OverlandModel::Kinematic => LateralCoupling::Kinematic,
            OverlandModel::Diffusive => LateralCoupling::Diffusive,
        };
        extract_surface_rows(ctx, faces, lateral, true);
    }
}

impl BoundaryRowHandler for OverlandKinematicHandler {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::OverlandKinematic
    }

    fn apply_boundary(&self, ctx: &mut RowContext<'_>, faces: &PatchFaces, _values: &[f64]) {
        model_for(OverlandModel::Kinematic).evaluate(ctx.surface, faces, EvalMode::Derivative, ctx.overland);
    }

    fn contribute_surface_coupling(&self, ctx: &mut CouplingContext<'_>, faces: &[BoundaryFace]) {
        extract_surface_rows(ctx, faces, LateralCoupling::Kinematic, false);
    }
}

impl BoundaryRowHandler for OverlandDiffusiveHandler {
    fn kind(&self) -> BoundaryKind {
        BoundaryKind::OverlandDiffusive
    }

    fn apply_boundary(&self, ctx: &mut RowContext<'_>, faces: &PatchFaces, _values: &[f64]) {
        model_for(OverlandModel::Diffusive).evaluate(ctx.surface, faces, EvalMode::Derivative, ctx.overland);
    }

    fn contribute_surface_coupling(&self, ctx: &mut CouplingContext<'_>, faces: &[BoundaryFace]) {
        extract_surface_rows(ctx, faces, LateralCoupling::Diffusive, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BcValue, BoundaryCondition, BoundaryPatchSet, PatchSide};
    use crate::grid::{DomainGeometry, Grid};
    use crate::stencil::StencilShape;
    use glam::IVec3;
    use rh_foundation::GhostBox;

    #[test]
    fn test_handler_lookup() {
        for kind in BoundaryKind::ALL {
            assert_eq!(handler_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_strip_folds_into_diagonal() {
        let gbox = GhostBox::new([0, 0, 0], [2, 1, 1], 1).unwrap();
        let mut j = StencilBlock::new(gbox, StencilShape::Seven);
        j.set(StencilSlot::Center, 0, 0, 0, 2.0);
        j.set(StencilSlot::West, 0, 0, 0, -0.5);
        let face = BoundaryFace {
            i: 0,
            j: 0,
            k: 0,
            dir: IVec3::NEG_X,
            ival: 0,
        };
        handler_for(BoundaryKind::Flux).strip_row(&mut j, &[face]);
        assert_eq!(j.get(StencilSlot::West, 0, 0, 0), 0.0);
        assert!((j.get(StencilSlot::Center, 0, 0, 0) - 1.5).abs() < 1e-14);
    }

    #[test]
    fn test_dirichlet_writes_ghost_pressure() {
        let gbox = GhostBox::new([0, 0, 0], [2, 1, 1], 1).unwrap();
        let mut p = SubField::filled(gbox, -1.0);
        let grid = Grid::uniform([2, 1, 1], [1.0, 1.0, 1.0]).unwrap();
        let set = BoundaryPatchSet::builder()
            .side("east", PatchSide::East, BoundaryCondition::dirichlet(BcValue::Constant(3.0)))
            .build(&grid, &DomainGeometry::full(&grid))
            .unwrap();
        let patch = set.get("east").unwrap();
        handler_for(BoundaryKind::Dirichlet).prepare_ghost(&mut p, patch.faces(0), &[3.0]);
        assert_eq!(p.get(2, 0, 0), 3.0);
        assert_eq!(p.get(1, 0, 0), -1.0);
    }
}
