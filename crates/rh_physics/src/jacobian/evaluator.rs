// crates/rh_physics/src/jacobian/evaluator.rs

//! 雅可比求值器
//!
//! [`RichardsJacobian`] 持有配置、问题数据、本构关系、幽灵交换服务与全部缓冲区。
//! 每次 [`RichardsJacobian::evaluate`] 清零并重建 J（与 JC），顺序为：
//!
//! 1. 复制并交换压力
//! 2. 密度、饱和度（原始压力）与储量项
//! 3. 写入 Dirichlet 幽灵压力，求相对渗透率
//! 4. 面项、对称模式边界修正、边界行修正、域内边界
//! 5. 坡面漫流问题：交换 J 与坡面导数，抽取 JC
//! 6. 域外单位行，最后交换 J 与 JC
//!
//! 子网格之间用 rayon 并行；幽灵交换失败立即返回，不重试。

use std::fmt;

use log::{debug, trace};
use rayon::prelude::*;
use rh_config::{JacobianConfig, OverlandModel};
use rh_foundation::RhResult;

use super::decomposition::set_outside_identity;
use super::operator::JacobianPair;
use super::subsurface::{accumulate_storage, add_face_terms, symmetric_boundary_correction, StorageInputs};
use super::{AssemblyParams, CellInputs, JacobianKind};
use crate::boundary::{
    handler_for, BoundaryKind, CouplingContext, InternalBoundary, NoInternalBoundary, RowContext,
};
use crate::constitutive::{ConstitutiveLaws, LawValue};
use crate::error::{AssemblyError, AssemblyResult};
use crate::fields::Field;
use crate::grid::Grid;
use crate::halo::{HaloExchange, LocalHaloExchange};
use crate::overland::{model_for, EvalMode, FaceConductance, OverlandInputs};
use crate::problem::ProblemData;
use crate::stencil::{StencilMatrix, StencilShape};

// ============================================================
// 缓冲区
// ============================================================

/// 每次组装重写的逐单元量
#[derive(Debug, Clone)]
struct Scratch {
    pressure: Field,
    old_pressure: Field,
    density: Field,
    d_density: Field,
    saturation: Field,
    d_saturation: Field,
    rel_perm: Field,
    d_rel_perm: Field,
}

impl Scratch {
    fn new(grid: &Grid) -> RhResult<Self> {
        let zero = || Field::new(grid);
        Ok(Self {
            pressure: zero()?,
            old_pressure: zero()?,
            density: zero()?,
            d_density: zero()?,
            saturation: zero()?,
            d_saturation: zero()?,
            rel_perm: zero()?,
            d_rel_perm: zero()?,
        })
    }

    fn cells<'a>(&'a self, problem: &'a ProblemData, s: usize) -> CellInputs<'a> {
        CellInputs {
            subgrid: &problem.grid().subgrids()[s],
            pressure: self.pressure.sub(s),
            density: self.density.sub(s),
            d_density: self.d_density.sub(s),
            rel_perm: self.rel_perm.sub(s),
            d_rel_perm: self.d_rel_perm.sub(s),
            perm_x: problem.perm_x().sub(s),
            perm_y: problem.perm_y().sub(s),
            perm_z: problem.perm_z().sub(s),
            z_mult: problem.z_mult().sub(s),
        }
    }

    fn surface<'a>(&'a self, problem: &'a ProblemData, s: usize, epsilon: f64) -> OverlandInputs<'a> {
        OverlandInputs {
            subgrid: &problem.grid().subgrids()[s],
            pressure: self.pressure.sub(s),
            old_pressure: self.old_pressure.sub(s),
            slope_x: problem.friction_slope_x().sub(s),
            slope_y: problem.friction_slope_y().sub(s),
            mannings: problem.mannings().sub(s),
            top: problem.top().sub(s),
            epsilon,
        }
    }
}

/// 逐点求本构关系的值与导数（含幽灵层）
fn evaluate_pointwise(
    value: &mut Field,
    derivative: &mut Field,
    pressure: &Field,
    density: Option<&Field>,
    law: impl Fn(f64, f64) -> LawValue + Sync,
) {
    value
        .subs_mut()
        .par_iter_mut()
        .zip(derivative.subs_mut().par_iter_mut())
        .enumerate()
        .for_each(|(s, (vs, ds))| {
            let p = pressure.sub(s).data();
            let rho = density.map(|f| f.sub(s).data());
            for (n, (v, d)) in vs.data_mut().iter_mut().zip(ds.data_mut().iter_mut()).enumerate() {
                let r = law(p[n], rho.map_or(0.0, |r| r[n]));
                *v = r.value;
                *d = r.derivative;
            }
        });
}

// ============================================================
// 求值器
// ============================================================

/// Richards 方程雅可比求值器
pub struct RichardsJacobian<H: HaloExchange = LocalHaloExchange> {
    config: JacobianConfig,
    problem: ProblemData,
    laws: ConstitutiveLaws,
    halo: H,
    internal: Box<dyn InternalBoundary>,
    kind: JacobianKind,
    scratch: Scratch,
    overland: Field<FaceConductance>,
    j: StencilMatrix,
    jc: Option<StencilMatrix>,
}

impl RichardsJacobian<LocalHaloExchange> {
    /// 使用进程内幽灵交换创建
    pub fn local(config: JacobianConfig, problem: ProblemData, laws: ConstitutiveLaws) -> AssemblyResult<Self> {
        let halo = LocalHaloExchange::new(problem.grid())?;
        Self::new(config, problem, laws, halo)
    }
}

impl<H: HaloExchange> RichardsJacobian<H> {
    /// 创建求值器
    ///
    /// 校验配置，决定组装方式，按网格分配 J、JC 与临时场。
    pub fn new(config: JacobianConfig, problem: ProblemData, laws: ConstitutiveLaws, halo: H) -> AssemblyResult<Self> {
        config.validate()?;
        let kind = JacobianKind::resolve(&config, problem.patches());
        let grid = problem.grid();

        let scratch = Scratch::new(grid)?;
        let overland = Field::new(problem.surface())?;
        let j = StencilMatrix::new(grid, StencilShape::Seven)?;
        let jc = if kind.has_surface() {
            Some(StencilMatrix::new(problem.surface(), StencilShape::Five)?)
        } else {
            None
        };

        debug!(
            "雅可比求值器: 网格 {:?}, {} 个子网格, 组装方式 {:?}, 重力公式 {}",
            grid.extents(),
            grid.num_subgrids(),
            kind,
            config.terrain_following.slope_upwind_formulation.name()
        );

        Ok(Self {
            config,
            problem,
            laws,
            halo,
            internal: Box::new(NoInternalBoundary),
            kind,
            scratch,
            overland,
            j,
            jc,
        })
    }

    /// 设置域内边界
    pub fn with_internal_boundary(mut self, internal: impl InternalBoundary + 'static) -> Self {
        self.internal = Box::new(internal);
        self
    }

    /// 配置
    pub fn config(&self) -> &JacobianConfig {
        &self.config
    }

    /// 问题数据
    pub fn problem(&self) -> &ProblemData {
        &self.problem
    }

    /// 组装方式
    pub fn kind(&self) -> JacobianKind {
        self.kind
    }

    /// 幽灵交换服务
    pub fn halo(&self) -> &H {
        &self.halo
    }

    fn check_inputs(&self, pressure: &Field, old_pressure: &Field) -> AssemblyResult<()> {
        let grid = self.problem.grid();
        pressure.check_layout(grid, "pressure")?;
        old_pressure.check_layout(grid, "old_pressure")?;
        Ok(())
    }

    /// 组装雅可比
    ///
    /// `symmetric_only` 为真时 J 只存对称部分（中心、东、北、上）；
    /// 坡面漫流问题在抽取 JC 前镜像为完整存储。
    pub fn evaluate(
        &mut self,
        pressure: &Field,
        old_pressure: &Field,
        dt: f64,
        time: f64,
        symmetric_only: bool,
    ) -> AssemblyResult<JacobianPair<'_, H>> {
        self.check_inputs(pressure, old_pressure)?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(AssemblyError::invalid_input(format!("时间步长必须为正有限值: {dt}")));
        }
        let params = AssemblyParams::new(&self.config, self.kind, dt, symmetric_only);
        trace!("组装雅可比: t = {time}, dt = {dt}, 对称 = {symmetric_only}");

        let Self {
            problem,
            laws,
            halo,
            internal,
            scratch,
            overland,
            j,
            jc,
            ..
        } = self;
        let problem: &ProblemData = problem;
        let halo: &H = halo;
        let grid = problem.grid();
        let geometry = problem.geometry();
        let subgrids = grid.subgrids();
        let patches = problem.patches();
        let g = params.gravity;

        j.clear();
        j.set_symmetric(symmetric_only);
        if let Some(jc) = jc.as_mut() {
            jc.clear();
        }
        overland.fill(FaceConductance::default());

        // 压力
        scratch.pressure.copy_from(pressure)?;
        scratch.old_pressure.copy_from(old_pressure)?;
        halo.exchange_field(&mut scratch.pressure)?;
        halo.exchange_field(&mut scratch.old_pressure)?;

        // 储量项
        evaluate_pointwise(&mut scratch.density, &mut scratch.d_density, &scratch.pressure, None, |p, _| {
            laws.density.density(p)
        });
        evaluate_pointwise(
            &mut scratch.saturation,
            &mut scratch.d_saturation,
            &scratch.pressure,
            Some(&scratch.density),
            |p, rho| laws.saturation.saturation(p, rho, g),
        );
        {
            let sc: &Scratch = scratch;
            j.blocks_mut().par_iter_mut().enumerate().for_each(|(s, block)| {
                let inputs = StorageInputs {
                    subgrid: &subgrids[s],
                    pressure: sc.pressure.sub(s),
                    density: sc.density.sub(s),
                    d_density: sc.d_density.sub(s),
                    saturation: sc.saturation.sub(s),
                    d_saturation: sc.d_saturation.sub(s),
                    porosity: problem.porosity().sub(s),
                    specific_storage: problem.specific_storage().sub(s),
                    z_mult: problem.z_mult().sub(s),
                };
                accumulate_storage(block, geometry, &inputs);
            });
        }

        // 边界给定值与 Dirichlet 幽灵压力
        let values = patches
            .patches()
            .iter()
            .map(|patch| patch.face_values(time, g, |f| problem.face_elevation(f)))
            .collect::<Result<Vec<_>, _>>()?;
        scratch.pressure.subs_mut().par_iter_mut().enumerate().for_each(|(s, p)| {
            for (patch, vals) in patches.patches().iter().zip(&values) {
                handler_for(patch.kind()).prepare_ghost(p, patch.faces(s), vals);
            }
        });
        evaluate_pointwise(
            &mut scratch.rel_perm,
            &mut scratch.d_rel_perm,
            &scratch.pressure,
            Some(&scratch.density),
            |p, rho| laws.rel_perm.rel_perm(p, rho, g),
        );

        // 面项与边界行
        let sc: &Scratch = scratch;
        let internal: &dyn InternalBoundary = internal.as_ref();
        let density_law = laws.density.as_ref();
        j.blocks_mut()
            .par_iter_mut()
            .zip(overland.subs_mut().par_iter_mut())
            .enumerate()
            .for_each(|(s, (block, ov))| {
                let cells = sc.cells(problem, s);
                let surface = sc.surface(problem, s, params.epsilon);
                add_face_terms(
                    block,
                    geometry,
                    &cells,
                    problem.terrain_slope_x().sub(s),
                    problem.terrain_slope_y().sub(s),
                    &params,
                );

                if params.symmetric {
                    for patch in patches.patches() {
                        symmetric_boundary_correction(block, &cells, patch.faces(s).owned(), &params);
                    }
                }

                for (patch, vals) in patches.patches().iter().zip(&values) {
                    let handler = handler_for(patch.kind());
                    let faces = patch.faces(s);
                    handler.strip_row(block, faces.owned());
                    let mut ctx = RowContext {
                        cells: &cells,
                        surface: &surface,
                        params: &params,
                        density_law,
                        j: &mut *block,
                        overland: &mut *ov,
                    };
                    handler.apply_boundary(&mut ctx, faces, vals);
                }

                internal.apply(block);
            });

        // 地表分块
        if let Some(jc) = jc.as_mut() {
            halo.exchange_matrix(j)?;
            halo.exchange_field(overland)?;
            if j.is_symmetric() {
                *j = j.mirrored();
            }

            let ov: &Field<FaceConductance> = overland;
            j.blocks_mut()
                .par_iter_mut()
                .zip(jc.blocks_mut().par_iter_mut())
                .enumerate()
                .for_each(|(s, (block, surface_block))| {
                    let cells = sc.cells(problem, s);
                    let surface = sc.surface(problem, s, params.epsilon);
                    let mut ctx = CouplingContext {
                        cells: &cells,
                        surface: &surface,
                        params: &params,
                        overland: ov.sub(s),
                        j: block,
                        jc: surface_block,
                    };
                    for patch in patches.patches() {
                        handler_for(patch.kind()).contribute_surface_coupling(&mut ctx, patch.faces(s).owned());
                    }
                });
        }

        j.blocks_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(s, block)| set_outside_identity(block, &subgrids[s], geometry));

        halo.exchange_matrix(j)?;
        if let Some(jc) = jc.as_mut() {
            halo.exchange_matrix(jc)?;
        }

        trace!("J 非零 {}，无穷范数 {:.3e}", j.nnz(), j.infinity_norm());
        let j: &StencilMatrix = j;
        let jc: &Option<StencilMatrix> = jc;
        Ok(JacobianPair::new(grid, problem.top(), halo, j, jc.as_ref()))
    }

    /// 在全部坡面漫流边界片上求坡面通量（或导数）
    ///
    /// 结果已做幽灵交换，拥有列上与整体求值一致。
    pub fn evaluate_overland(
        &mut self,
        pressure: &Field,
        old_pressure: &Field,
        mode: EvalMode,
    ) -> AssemblyResult<&Field<FaceConductance>> {
        self.check_inputs(pressure, old_pressure)?;
        let Self {
            config,
            problem,
            halo,
            scratch,
            overland,
            ..
        } = self;
        let problem: &ProblemData = problem;
        let generic = config.overland.model;
        let epsilon = config.overland.epsilon;

        scratch.pressure.copy_from(pressure)?;
        scratch.old_pressure.copy_from(old_pressure)?;
        halo.exchange_field(&mut scratch.pressure)?;
        halo.exchange_field(&mut scratch.old_pressure)?;
        overland.fill(FaceConductance::default());

        let sc: &Scratch = scratch;
        overland.subs_mut().par_iter_mut().enumerate().for_each(|(s, ov)| {
            let surface = sc.surface(problem, s, epsilon);
            for patch in problem.patches().patches() {
                let model = match patch.kind() {
                    BoundaryKind::OverlandKinematic => OverlandModel::Kinematic,
                    BoundaryKind::OverlandDiffusive => OverlandModel::Diffusive,
                    BoundaryKind::Overland => generic,
                    _ => continue,
                };
                model_for(model).evaluate(&surface, patch.faces(s), mode, ov);
            }
        });
        halo.exchange_field(overland)?;
        Ok(overland)
    }
}

impl<H: HaloExchange> fmt::Debug for RichardsJacobian<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichardsJacobian")
            .field("kind", &self.kind)
            .field("extents", &self.problem.grid().extents())
            .field("has_jc", &self.jc.is_some())
            .finish_non_exhaustive()
    }
}
