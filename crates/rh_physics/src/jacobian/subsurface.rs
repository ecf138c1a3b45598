// crates/rh_physics/src/jacobian/subsurface.rs

//! 地下 7 点模板
//!
//! 单个子网格上的三部分：
//!
//! - [`accumulate_storage`]: 储量项，只加在对角上
//! - [`add_face_terms`]: 东、北、上三个面的达西通量对压力的导数
//! - [`symmetric_boundary_correction`]: 对称模式下边界面法向槽位补上非对称部分
//!
//! 面项遍历向低侧扩展一层幽灵的范围，子网格低侧边界上的面由本子网格自己算出；
//! 写到高侧幽灵单元的系数在随后的矩阵交换中被拥有者的值覆盖。

use crate::boundary::BoundaryFace;
use crate::fields::SubField;
use crate::grid::{DomainGeometry, Subgrid};
use crate::numerics::means::{arithmetic_mean, harmonic_mean, harmonic_mean_dz, upstream_mean};
use crate::stencil::{StencilBlock, StencilSlot};

use super::terrain::gravity_pair;
use super::{AssemblyParams, CellInputs};

// ============================================================
// 储量项
// ============================================================

/// 储量项的输入（单个子网格）
#[derive(Debug, Clone, Copy)]
pub struct StorageInputs<'a> {
    /// 所在子网格
    pub subgrid: &'a Subgrid,
    /// 压力
    pub pressure: &'a SubField,
    /// 密度
    pub density: &'a SubField,
    /// 密度导数
    pub d_density: &'a SubField,
    /// 饱和度
    pub saturation: &'a SubField,
    /// 饱和度导数
    pub d_saturation: &'a SubField,
    /// 孔隙度
    pub porosity: &'a SubField,
    /// 贮水率
    pub specific_storage: &'a SubField,
    /// 层厚乘子
    pub z_mult: &'a SubField,
}

/// 储量项 `(S'ρ + Sρ')·φ·V + Ss·V·(S'ρp + Sρ'p + Sρ)`，`V = dx·dy·dz·zmult`
pub fn accumulate_storage(j: &mut StencilBlock, geometry: &DomainGeometry, inputs: &StorageInputs<'_>) {
    let s = inputs.subgrid;
    let vol = s.cell_volume();
    for (i, jj, k) in s.owned().iter().filter(|&(i, jj, k)| geometry.is_inside(i, jj, k)) {
        let vol2 = vol * inputs.z_mult.get(i, jj, k);
        let p = inputs.pressure.get(i, jj, k);
        let d = inputs.density.get(i, jj, k);
        let dd = inputs.d_density.get(i, jj, k);
        let sat = inputs.saturation.get(i, jj, k);
        let sd = inputs.d_saturation.get(i, jj, k);
        let ss = inputs.specific_storage.get(i, jj, k);

        let term = (sd * d + sat * dd) * inputs.porosity.get(i, jj, k) * vol2
            + ss * vol2 * (sd * d * p + sat * dd * p + sat * d);
        j.add(StencilSlot::Center, i, jj, k, term);
    }
}

// ============================================================
// 面项
// ============================================================

/// 单元的迁移率 `kr·ρ` 与其导数
#[inline]
fn mobility(cells: &CellInputs<'_>, i: i32, j: i32, k: i32) -> (f64, f64) {
    let d = cells.density.get(i, j, k);
    let rp = cells.rel_perm.get(i, j, k);
    (rp * d, cells.d_rel_perm.get(i, j, k) * d + rp * cells.d_density.get(i, j, k))
}

/// 一个面上的三个系数：对低侧单元、对高侧单元、对称部分
#[derive(Debug, Clone, Copy, Default)]
struct FaceCoefficients {
    low: f64,
    high: f64,
    symmetric: f64,
}

/// 侧向面（x 或 y）
fn lateral_face(
    coeff: f64,
    spacing: f64,
    diff: f64,
    along: f64,
    normal: f64,
    (prod, prod_der): (f64, f64),
    (prod_n, prod_n_der): (f64, f64),
) -> FaceCoefficients {
    let updir = (diff / spacing) * normal - along;
    let symmetric = -coeff * upstream_mean(updir, 0.0, prod, prod_n) * normal;
    let low_der = upstream_mean(updir, 0.0, prod_der, 0.0);
    let high_der = upstream_mean(updir, 0.0, 0.0, prod_n_der);
    FaceCoefficients {
        low: -coeff * diff * low_der * normal + symmetric + coeff * spacing * low_der * along,
        high: coeff * diff * high_der * normal + symmetric - coeff * spacing * high_der * along,
        symmetric,
    }
}

/// 东、北、上三个面的通量导数
///
/// 对每个活动单元 `c` 与其高侧邻居 `n`：`c` 的对角减去对 `c` 的导数，
/// `n` 的对角减去对 `n` 的导数；非对称模式同时写入 `c` 的东/北/上槽位与 `n` 的西/南/下槽位，
/// 对称模式只写对称部分。
pub fn add_face_terms(
    j: &mut StencilBlock,
    geometry: &DomainGeometry,
    cells: &CellInputs<'_>,
    slope_x: &SubField,
    slope_y: &SubField,
    params: &AssemblyParams,
) {
    let s = cells.subgrid;
    let (dx, dy, dz) = (s.dx, s.dy, s.dz);
    let (dt, g, mu) = (params.dt, params.gravity, params.viscosity);
    let (ffx, ffy, ffz) = (dy * dz, dx * dz, dx * dy);
    let p = cells.pressure;
    let zmult = cells.z_mult;

    let range = j.gbox().low_extended();
    for (i, jj, k) in range.iter().filter(|&(i, jj, k)| geometry.is_inside(i, jj, k)) {
        let own = mobility(cells, i, jj, k);
        let east = mobility(cells, i + 1, jj, k);
        let north = mobility(cells, i, jj + 1, k);
        let upper = mobility(cells, i, jj, k + 1);
        let zm = zmult.get(i, jj, k);
        let pc = p.get(i, jj, k);

        // x
        let gx = gravity_pair(params.slope_upwind, g, slope_x.get(i, jj, 0), slope_x.get(i + 1, jj, 0));
        let x_coeff = dt * ffx / dx * zm * harmonic_mean(cells.perm_x.get(i, jj, k), cells.perm_x.get(i + 1, jj, k)) / mu;
        let fx = lateral_face(x_coeff, dx, pc - p.get(i + 1, jj, k), gx.along, gx.normal, own, east);

        // y
        let gy = gravity_pair(params.slope_upwind, g, slope_y.get(i, jj, 0), slope_y.get(i, jj + 1, 0));
        let y_coeff = dt * ffy / dy * zm * harmonic_mean(cells.perm_y.get(i, jj, k), cells.perm_y.get(i, jj + 1, k)) / mu;
        let fy = lateral_face(y_coeff, dy, pc - p.get(i, jj + 1, k), gy.along, gy.normal, own, north);

        // z：按层厚加权的势
        let zu = zmult.get(i, jj, k + 1);
        let sep = dz * arithmetic_mean(zm, zu);
        let d_c = cells.density.get(i, jj, k);
        let d_u = cells.density.get(i, jj, k + 1);
        let lower = pc / sep - zm / (zm + zu) * d_c * g;
        let upper_pot = p.get(i, jj, k + 1) / sep + zu / (zm + zu) * d_u * g;
        let diff = lower - upper_pot;
        let z_coeff = dt * ffz * harmonic_mean_dz(cells.perm_z.get(i, jj, k), cells.perm_z.get(i, jj, k + 1), zm, zu) / mu;
        let mob = upstream_mean(lower, upper_pot, own.0, upper.0);
        let z_sym = -z_coeff / sep * mob;
        let fz = FaceCoefficients {
            low: -z_coeff
                * (diff * upstream_mean(lower, upper_pot, own.1, 0.0)
                    - g * 0.5 * sep * cells.d_density.get(i, jj, k) * mob)
                + z_sym,
            high: z_coeff
                * (diff * upstream_mean(lower, upper_pot, 0.0, upper.1)
                    - g * 0.5 * sep * cells.d_density.get(i, jj, k + 1) * mob)
                + z_sym,
            symmetric: z_sym,
        };

        j.add(StencilSlot::Center, i, jj, k, -(fx.low + fy.low + fz.low));
        j.add(StencilSlot::Center, i + 1, jj, k, -fx.high);
        j.add(StencilSlot::Center, i, jj + 1, k, -fy.high);
        j.add(StencilSlot::Center, i, jj, k + 1, -fz.high);

        if params.symmetric {
            j.add(StencilSlot::East, i, jj, k, fx.symmetric);
            j.add(StencilSlot::North, i, jj, k, fy.symmetric);
            j.add(StencilSlot::Upper, i, jj, k, fz.symmetric);
        } else {
            j.add(StencilSlot::East, i, jj, k, fx.high);
            j.add(StencilSlot::North, i, jj, k, fy.high);
            j.add(StencilSlot::Upper, i, jj, k, fz.high);
            j.add(StencilSlot::West, i + 1, jj, k, fx.low);
            j.add(StencilSlot::South, i, jj + 1, k, fy.low);
            j.add(StencilSlot::Lower, i, jj, k + 1, fz.low);
        }
    }
}

// ============================================================
// 对称模式边界修正
// ============================================================

/// 对称模式下，把边界面法向槽位补上非对称部分
///
/// 随后的行剥离会把整个系数并入对角；不做这一步，对角上会残留非对称部分。
pub fn symmetric_boundary_correction(j: &mut StencilBlock, cells: &CellInputs<'_>, faces: &[BoundaryFace], params: &AssemblyParams) {
    let s = cells.subgrid;
    let (dx, dy, dz) = (s.dx, s.dy, s.dz);
    let (dt, g, mu) = (params.dt, params.gravity, params.viscosity);
    let p = cells.pressure;

    for f in faces {
        let (i, jj, k) = (f.i, f.j, f.k);
        let o = f.outside();
        let pc = p.get(i, jj, k);
        let po = p.get(o.x, o.y, o.z);
        let zm = cells.z_mult.get(i, jj, k);
        let (prod, _) = mobility(cells, i, jj, k);
        let (prod_o, prod_o_der) = mobility(cells, o.x, o.y, o.z);

        let slot = f.slot();
        let value = match slot {
            StencilSlot::West | StencilSlot::East | StencilSlot::South | StencilSlot::North => {
                let (area, h, perm) = match slot {
                    StencilSlot::West | StencilSlot::East => (dy * dz, dx, cells.perm_x),
                    _ => (dx * dz, dy, cells.perm_y),
                };
                let coeff = dt * zm * area / h * harmonic_mean(perm.get(o.x, o.y, o.z), perm.get(i, jj, k)) / mu;
                match slot {
                    StencilSlot::West | StencilSlot::South => -coeff * (po - pc) * upstream_mean(po, pc, prod_o_der, 0.0),
                    StencilSlot::East => coeff * (pc - po) * upstream_mean(pc, po, 0.0, prod_o_der),
                    _ => -coeff * (pc - po) * upstream_mean(pc, po, 0.0, prod_o_der),
                }
            }
            StencilSlot::Lower | StencilSlot::Upper => {
                let zo = cells.z_mult.get(o.x, o.y, o.z);
                let sep = dz * arithmetic_mean(zm, zo);
                let half = 0.5 * sep * g;
                let d_c = cells.density.get(i, jj, k);
                let d_o = cells.density.get(o.x, o.y, o.z);
                let dd_c = cells.d_density.get(i, jj, k);
                let (perm_c, perm_o) = (cells.perm_z.get(i, jj, k), cells.perm_z.get(o.x, o.y, o.z));
                if slot == StencilSlot::Lower {
                    let lower = po - half * d_o;
                    let upper = pc + half * d_c;
                    let coeff = dt * dx * dy / sep * harmonic_mean_dz(perm_o, perm_c, zo, zm) / mu;
                    -coeff
                        * ((lower - upper) * upstream_mean(lower, upper, prod_o_der, 0.0)
                            - half * dd_c * upstream_mean(lower, upper, prod_o, prod))
                } else {
                    let lower = pc - half * d_c;
                    let upper = po + half * d_o;
                    let coeff = dt * dx * dy / sep * harmonic_mean_dz(perm_c, perm_o, zm, zo) / mu;
                    -coeff
                        * ((lower - upper) * upstream_mean(lower, upper, 0.0, prod_o_der)
                            - half * dd_c * upstream_mean(lower, upper, prod, prod_o))
                }
            }
            StencilSlot::Center => 0.0,
        };
        j.add(slot, i, jj, k, value);
    }
}
