// crates/rh_physics/src/overland/kinematic.rs

//! 运动波坡面漫流
//!
//! 摩擦坡度取地表坡度 `Sf = S`，x 方向面通量
//!
//! ```text
//! qx = -Sx / (sqrt(|Sf|)·n) · P^(5/3),   P = upwind(max(p_c, 0), max(p_e, 0))
//! ```
//!
//! 迎风方向只由坡度符号决定。导数模式把 `dq/dP` 按迎风侧拆到面的两侧单元：
//! 正值记在低侧单元的 `ke`，负值记在高侧单元的 `kw`。
//!
//! 低侧邻列没有活动单元且坡度指向域外时，按本列水深补出西（南）侧面通量。

use rh_config::OverlandModel;
use rh_foundation::float::{floor_magnitude, positive_part};

use super::{
    gather_face_fluxes, manning_coefficient, top_faces, EvalMode, FaceConductance,
    OverlandFlowModel, OverlandInputs, DEPTH_EXPONENT,
};
use crate::boundary::PatchFaces;
use crate::fields::SubField;
use crate::numerics::means::upstream_mean;

/// 运动波模型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KinematicWave;

impl OverlandFlowModel for KinematicWave {
    fn model(&self) -> OverlandModel {
        OverlandModel::Kinematic
    }

    fn evaluate(
        &self,
        inputs: &OverlandInputs<'_>,
        faces: &PatchFaces,
        mode: EvalMode,
        out: &mut SubField<FaceConductance>,
    ) {
        for f in top_faces(faces) {
            let (i, j) = (f.i, f.j);
            let Some(k1) = inputs.top_of(i, j) else {
                continue;
            };

            let sx = inputs.slope_x.get(i, j, 0);
            let sy = inputs.slope_y.get(i, j, 0);
            let mag = floor_magnitude(sx.hypot(sy), inputs.epsilon);
            let coeff = manning_coefficient(mag, inputs.mannings.get(i, j, 0));
            let pc = positive_part(inputs.pressure.get(i, j, k1));

            // 东侧面
            if inputs.column_in_storage(i + 1, j) {
                let pe = positive_part(inputs.pressure.get(i + 1, j, k1));
                let px = upstream_mean(-sx, 0.0, pc, pe);
                match mode {
                    EvalMode::Value => out.get_mut(i, j, 0).qx = -sx * coeff * px.powf(DEPTH_EXPONENT),
                    EvalMode::Derivative => {
                        let qx = -DEPTH_EXPONENT * sx * coeff * px.powf(DEPTH_EXPONENT - 1.0);
                        out.get_mut(i, j, 0).ke = qx.max(0.0);
                        out.get_mut(i + 1, j, 0).kw = -(-qx).max(0.0);
                    }
                }
            }

            // 北侧面
            if inputs.column_in_storage(i, j + 1) {
                let pn = positive_part(inputs.pressure.get(i, j + 1, k1));
                let py = upstream_mean(-sy, 0.0, pc, pn);
                match mode {
                    EvalMode::Value => out.get_mut(i, j, 0).qy = -sy * coeff * py.powf(DEPTH_EXPONENT),
                    EvalMode::Derivative => {
                        let qy = -DEPTH_EXPONENT * sy * coeff * py.powf(DEPTH_EXPONENT - 1.0);
                        out.get_mut(i, j, 0).kn = qy.max(0.0);
                        out.get_mut(i, j + 1, 0).ks = -(-qy).max(0.0);
                    }
                }
            }

            // 西侧为无活动单元的列
            if inputs.column_in_storage(i - 1, j) && inputs.top.get(i - 1, j, 0) < 0 && sx > 0.0 {
                match mode {
                    EvalMode::Value => {
                        out.get_mut(i - 1, j, 0).qx = -sx * coeff * pc.powf(DEPTH_EXPONENT);
                    }
                    EvalMode::Derivative => {
                        let q = -DEPTH_EXPONENT * sx * coeff * pc.powf(DEPTH_EXPONENT - 1.0);
                        out.get_mut(i, j, 0).kw = q;
                        out.get_mut(i - 1, j, 0).ke = q;
                    }
                }
            }

            // 南侧为无活动单元的列
            if inputs.column_in_storage(i, j - 1) && inputs.top.get(i, j - 1, 0) < 0 && sy > 0.0 {
                match mode {
                    EvalMode::Value => {
                        out.get_mut(i, j - 1, 0).qy = -sy * coeff * pc.powf(DEPTH_EXPONENT);
                    }
                    EvalMode::Derivative => {
                        let q = -DEPTH_EXPONENT * sy * coeff * pc.powf(DEPTH_EXPONENT - 1.0);
                        out.get_mut(i, j, 0).ks = q;
                        out.get_mut(i, j - 1, 0).kn = q;
                    }
                }
            }
        }

        if mode == EvalMode::Value {
            gather_face_fluxes(faces, out);
        }
    }
}
