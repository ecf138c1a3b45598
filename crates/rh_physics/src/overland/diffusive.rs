// crates/rh_physics/src/overland/diffusive.rs

//! 扩散波坡面漫流
//!
//! 摩擦坡度计入积水深度梯度：
//!
//! ```text
//! Sf_x = Sx + (max(p_e, 0) - max(p_c, 0)) / dx
//! qx   = -Sf_x / (sqrt(|Sf_o|)·n) · P^(5/3)
//! ```
//!
//! 坡度模长 `|Sf_o|` 用上一时刻压力计算，在一次牛顿迭代内视为常数。
//! 面通量同时依赖两侧单元压力，导数分别记入对本单元（`ke, kw, kn, ks`）
//! 与对邻居（`ke_ns, kw_ns, kn_ns, ks_ns`）的输出。

use rh_config::OverlandModel;
use rh_foundation::float::{floor_magnitude, heaviside, positive_part};

use super::{
    gather_face_fluxes, manning_coefficient, top_faces, EvalMode, FaceConductance,
    OverlandFlowModel, OverlandInputs, DEPTH_EXPONENT,
};
use crate::boundary::PatchFaces;
use crate::fields::SubField;
use crate::numerics::means::upstream_mean;

/// 扩散波模型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffusiveWave;

/// 一个面上的通量及其对两侧压力的导数
#[derive(Debug, Clone, Copy)]
struct FaceFlux {
    q: f64,
    d_low: f64,
    d_high: f64,
}

/// 低侧单元 `pl`、高侧单元 `ph` 之间的面通量
///
/// `slope` 为该方向地表坡度，`h` 为间距，`coeff` 为 Manning 系数。
fn face_flux(slope: f64, pl: f64, ph: f64, h: f64, coeff: f64) -> FaceFlux {
    let (al, ah) = (positive_part(pl), positive_part(ph));
    let (hl, hh) = (heaviside(pl), heaviside(ph));
    let sf = slope + (ah - al) / h;
    let depth = upstream_mean(-sf, 0.0, al, ah);
    let low_upwind = -sf >= 0.0;

    let p53 = depth.powf(DEPTH_EXPONENT);
    let p23 = depth.powf(DEPTH_EXPONENT - 1.0);
    let up_l = if low_upwind { hl } else { 0.0 };
    let up_h = if low_upwind { 0.0 } else { hh };

    FaceFlux {
        q: -sf * coeff * p53,
        d_low: -coeff * ((-hl / h) * p53 + sf * DEPTH_EXPONENT * p23 * up_l),
        d_high: -coeff * ((hh / h) * p53 + sf * DEPTH_EXPONENT * p23 * up_h),
    }
}

impl OverlandFlowModel for DiffusiveWave {
    fn model(&self) -> OverlandModel {
        OverlandModel::Diffusive
    }

    fn evaluate(
        &self,
        inputs: &OverlandInputs<'_>,
        faces: &PatchFaces,
        mode: EvalMode,
        out: &mut SubField<FaceConductance>,
    ) {
        let (dx, dy) = (inputs.subgrid.dx, inputs.subgrid.dy);

        for f in top_faces(faces) {
            let (i, j) = (f.i, f.j);
            let Some(k1) = inputs.top_of(i, j) else {
                continue;
            };

            let sx = inputs.slope_x.get(i, j, 0);
            let sy = inputs.slope_y.get(i, j, 0);
            let n = inputs.mannings.get(i, j, 0);
            let pc = inputs.pressure.get(i, j, k1);

            let east = inputs.column_in_storage(i + 1, j);
            let north = inputs.column_in_storage(i, j + 1);
            if east || north {
                // 坡度模长滞后到上一时刻；邻列不在存储区时该方向不计水面梯度
                let oc = positive_part(inputs.old_pressure.get(i, j, k1));
                let old_of = |ni: i32, nj: i32, readable: bool| {
                    if readable {
                        positive_part(inputs.old_pressure.get(ni, nj, k1))
                    } else {
                        oc
                    }
                };
                let sfx_old = sx + (old_of(i + 1, j, east) - oc) / dx;
                let sfy_old = sy + (old_of(i, j + 1, north) - oc) / dy;
                let mag = floor_magnitude(sfx_old.hypot(sfy_old), inputs.epsilon);
                let coeff = manning_coefficient(mag, n);

                if east {
                    let fx = face_flux(sx, pc, inputs.pressure.get(i + 1, j, k1), dx, coeff);
                    match mode {
                        EvalMode::Value => out.get_mut(i, j, 0).qx = fx.q,
                        EvalMode::Derivative => {
                            let cell = out.get_mut(i, j, 0);
                            cell.ke = fx.d_low;
                            cell.ke_ns = fx.d_high;
                            let e = out.get_mut(i + 1, j, 0);
                            e.kw = fx.d_high;
                            e.kw_ns = fx.d_low;
                        }
                    }
                }

                if north {
                    let fy = face_flux(sy, pc, inputs.pressure.get(i, j + 1, k1), dy, coeff);
                    match mode {
                        EvalMode::Value => out.get_mut(i, j, 0).qy = fy.q,
                        EvalMode::Derivative => {
                            let cell = out.get_mut(i, j, 0);
                            cell.kn = fy.d_low;
                            cell.kn_ns = fy.d_high;
                            let nb = out.get_mut(i, j + 1, 0);
                            nb.ks = fy.d_high;
                            nb.ks_ns = fy.d_low;
                        }
                    }
                }
            }

            // 低侧无活动列：只用地表坡度，本列为迎风侧
            let west_open = inputs.column_in_storage(i - 1, j) && inputs.top.get(i - 1, j, 0) < 0;
            let south_open = inputs.column_in_storage(i, j - 1) && inputs.top.get(i, j - 1, 0) < 0;
            if !(west_open && sx > 0.0) && !(south_open && sy > 0.0) {
                continue;
            }

            let mag = floor_magnitude(sx.hypot(sy), inputs.epsilon);
            let coeff = manning_coefficient(mag, n);
            let depth = positive_part(pc);
            let p53 = depth.powf(DEPTH_EXPONENT);
            let dp = DEPTH_EXPONENT * depth.powf(DEPTH_EXPONENT - 1.0) * heaviside(pc);

            if west_open && sx > 0.0 {
                match mode {
                    EvalMode::Value => out.get_mut(i - 1, j, 0).qx = -sx * coeff * p53,
                    EvalMode::Derivative => {
                        let d = -sx * coeff * dp;
                        let cell = out.get_mut(i, j, 0);
                        cell.kw = d;
                        cell.kw_ns = 0.0;
                        let west = out.get_mut(i - 1, j, 0);
                        west.ke = 0.0;
                        west.ke_ns = d;
                    }
                }
            }

            if south_open && sy > 0.0 {
                match mode {
                    EvalMode::Value => out.get_mut(i, j - 1, 0).qy = -sy * coeff * p53,
                    EvalMode::Derivative => {
                        let d = -sy * coeff * dp;
                        let cell = out.get_mut(i, j, 0);
                        cell.ks = d;
                        cell.ks_ns = 0.0;
                        let south = out.get_mut(i, j - 1, 0);
                        south.kn = 0.0;
                        south.kn_ns = d;
                    }
                }
            }
        }

        if mode == EvalMode::Value {
            gather_face_fluxes(faces, out);
        }
    }
}
