// crates/rh_physics/src/jacobian/decomposition.rs

//! 地下/地表分块
//!
//! 顶面单元的方程同时含地下与地表两部分。分块后：
//!
//! - 顶面单元的对角，以及指向同层顶面邻居的侧向系数，从 J 搬到地表矩阵 JC（J 中清零）
//! - 指向非顶面邻居的系数留在 J
//! - 坡面通量导数只加在 JC 上
//!
//! JC 以地表网格 `(i, j, 0)` 为行，作用在各列的顶面单元上。

use crate::boundary::{BoundaryFace, CouplingContext};
use crate::grid::{DomainGeometry, Subgrid};
use crate::stencil::{StencilBlock, StencilSlot};

/// JC 侧向系数取自哪组坡面导数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralCoupling {
    /// 运动波：取邻居单元上对邻居压力的导数
    Kinematic,
    /// 扩散波：取本单元上对邻居压力的导数（`*_ns`）
    Diffusive,
}

/// 把顶面行搬到 JC 并加上坡面通量导数
///
/// `damping` 为真时，未积水的单元加上起转阻尼 `dt·(V/dz)·P1·exp(min(p,0)·P1)·P2`。
pub fn extract_surface_rows(
    ctx: &mut CouplingContext<'_>,
    faces: &[BoundaryFace],
    lateral: LateralCoupling,
    damping: bool,
) {
    let s = ctx.cells.subgrid;
    let (dx, dy, dz) = (s.dx, s.dy, s.dz);
    let vol = s.cell_volume();
    let params = ctx.params;
    let dt = params.dt;
    let surface = ctx.surface;
    let k_of = |slot: StencilSlot, i: i32, j: i32| {
        let o = slot.offset();
        surface.top_of(i + o.x, j + o.y)
    };

    for f in faces.iter().filter(|f| f.is_top()) {
        let (i, j, k) = (f.i, f.j, f.k);

        let center = ctx.j.take(StencilSlot::Center, i, j, k);
        ctx.jc.set(StencilSlot::Center, i, j, 0, center);
        for slot in StencilSlot::LATERAL {
            if k_of(slot, i, j) == Some(k) {
                let v = ctx.j.take(slot, i, j, k);
                ctx.jc.add(slot, i, j, 0, v);
            }
        }

        let q = ctx.overland.get(i, j, 0);
        let p = ctx.cells.pressure.get(i, j, k);
        if p > 0.0 {
            let term = vol / dz + dy * dt * (q.ke - q.kw) + dx * dt * (q.kn - q.ks);
            ctx.jc.add(StencilSlot::Center, i, j, 0, term);
        } else if damping {
            let p1 = params.damp_p1;
            let term = dt * (vol / dz) * p1 * (p.min(0.0) * p1).exp() * params.damp_p2;
            ctx.jc.add(StencilSlot::Center, i, j, 0, term);
        }

        let (west, east, south, north) = match lateral {
            LateralCoupling::Kinematic => (
                ctx.overland.get(i - 1, j, 0).ke,
                ctx.overland.get(i + 1, j, 0).kw,
                ctx.overland.get(i, j - 1, 0).kn,
                ctx.overland.get(i, j + 1, 0).ks,
            ),
            LateralCoupling::Diffusive => (q.kw_ns, q.ke_ns, q.ks_ns, q.kn_ns),
        };
        ctx.jc.add(StencilSlot::West, i, j, 0, -dy * dt * west);
        ctx.jc.add(StencilSlot::East, i, j, 0, dy * dt * east);
        ctx.jc.add(StencilSlot::South, i, j, 0, -dx * dt * south);
        ctx.jc.add(StencilSlot::North, i, j, 0, dx * dt * north);
    }
}

/// 域外拥有单元的行置为单位行
pub fn set_outside_identity(j: &mut StencilBlock, subgrid: &Subgrid, geometry: &DomainGeometry) {
    for (i, jj, k) in subgrid.owned().iter() {
        if !geometry.is_inside(i, jj, k) {
            j.set_identity_row(i, jj, k);
        }
    }
}
