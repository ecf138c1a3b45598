// crates/rh_physics/src/jacobian/operator.rs

//! 组装结果与矩阵向量乘
//!
//! [`JacobianPair`] 借用求值器内部的 J 与 JC，直到下一次组装。
//! 有 JC 时，顶面单元所在行的对角与同层侧向耦合来自 JC，其余来自 J；
//! 对称存储的 J 在乘法中按镜像读取西/南/下系数。

use rayon::prelude::*;

use crate::error::AssemblyResult;
use crate::fields::{Field, SubField};
use crate::grid::Grid;
use crate::halo::{HaloExchange, LocalHaloExchange};
use crate::numerics::csr::{CsrBuilder, CsrMatrix};
use crate::stencil::{StencilBlock, StencilMatrix, StencilSlot};

/// 一次组装得到的 (J, JC)
#[derive(Debug)]
pub struct JacobianPair<'a, H: HaloExchange = LocalHaloExchange> {
    grid: &'a Grid,
    top: &'a Field<i32>,
    halo: &'a H,
    j: &'a StencilMatrix,
    jc: Option<&'a StencilMatrix>,
}

/// 读取系数，对称存储时西/南/下取自邻居的东/北/上
#[inline]
fn coefficient(block: &StencilBlock, symmetric: bool, slot: StencilSlot, i: i32, j: i32, k: i32) -> f64 {
    if symmetric && !slot.is_stored_in_symmetric() {
        let n = slot.offset();
        let (ni, nj, nk) = (i + n.x, j + n.y, k + n.z);
        if block.gbox().contains(ni, nj, nk) {
            block.get(slot.opposite(), ni, nj, nk)
        } else {
            0.0
        }
    } else {
        block.get(slot, i, j, k)
    }
}

/// 地表列的顶层，无活动单元为 `None`
#[inline]
fn column_top(top: &SubField<i32>, i: i32, j: i32) -> Option<i32> {
    top.try_get(i, j, 0).filter(|&k| k >= 0)
}

impl<'a, H: HaloExchange> JacobianPair<'a, H> {
    pub(crate) fn new(
        grid: &'a Grid,
        top: &'a Field<i32>,
        halo: &'a H,
        j: &'a StencilMatrix,
        jc: Option<&'a StencilMatrix>,
    ) -> Self {
        Self {
            grid,
            top,
            halo,
            j,
            jc,
        }
    }

    /// 地下矩阵
    pub fn j(&self) -> &'a StencilMatrix {
        self.j
    }

    /// 地表矩阵（坡面漫流问题才有）
    pub fn jc(&self) -> Option<&'a StencilMatrix> {
        self.jc
    }

    /// J 是否为完整存储
    pub fn is_full_storage(&self) -> bool {
        !self.j.is_symmetric()
    }

    /// `y = A·x`
    ///
    /// 先交换 `x` 的幽灵层；`y` 只写拥有单元。
    pub fn apply(&self, x: &mut Field, y: &mut Field) -> AssemblyResult<()> {
        x.check_layout(self.grid, "x")?;
        y.check_layout(self.grid, "y")?;
        self.halo.exchange_field(x)?;

        let symmetric = self.j.is_symmetric();
        let x: &Field = x;
        y.subs_mut().par_iter_mut().enumerate().for_each(|(s, ys)| {
            let block = self.j.block(s);
            let xs = x.sub(s);
            for (i, j, k) in block.gbox().owned().iter() {
                let sum: f64 = StencilSlot::ALL
                    .iter()
                    .map(|&slot| {
                        let o = slot.offset();
                        coefficient(block, symmetric, slot, i, j, k) * xs.get(i + o.x, j + o.y, k + o.z)
                    })
                    .sum();
                ys.set(i, j, k, sum);
            }

            if let Some(jc) = self.jc {
                let surface = jc.block(s);
                let top = self.top.sub(s);
                let owned = block.gbox().owned();
                for (i, j, _) in surface.gbox().owned().iter() {
                    let Some(k) = column_top(top, i, j) else {
                        continue;
                    };
                    let mut sum = surface.get(StencilSlot::Center, i, j, 0) * xs.get(i, j, k);
                    for slot in StencilSlot::LATERAL {
                        let o = slot.offset();
                        if let Some(kn) = column_top(top, i + o.x, j + o.y) {
                            sum += surface.get(slot, i, j, 0) * xs.get(i + o.x, j + o.y, kn);
                        }
                    }
                    if owned.contains(i, j, k) {
                        ys.add(i, j, k, sum);
                    }
                }
            }
        });
        Ok(())
    }

    /// 导出为全局 CSR 矩阵，行列编号 `i + nx·(j + ny·k)`
    pub fn to_csr(&self) -> CsrMatrix {
        let [nx, ny, _] = self.grid.extents();
        let index = |i: i32, j: i32, k: i32| (i + nx * (j + ny * k)) as usize;
        let symmetric = self.j.is_symmetric();
        let mut builder = CsrBuilder::new_square(self.grid.num_cells());

        for (s, block) in self.j.blocks().iter().enumerate() {
            for (i, j, k) in block.gbox().owned().iter() {
                let row = index(i, j, k);
                for slot in StencilSlot::ALL {
                    let o = slot.offset();
                    let (ni, nj, nk) = (i + o.x, j + o.y, k + o.z);
                    if self.grid.contains(ni, nj, nk) {
                        builder.add(row, index(ni, nj, nk), coefficient(block, symmetric, slot, i, j, k));
                    }
                }
            }

            if let Some(jc) = self.jc {
                let surface = jc.block(s);
                let top = self.top.sub(s);
                for (i, j, _) in surface.gbox().owned().iter() {
                    let Some(k) = column_top(top, i, j) else {
                        continue;
                    };
                    let row = index(i, j, k);
                    builder.add(row, row, surface.get(StencilSlot::Center, i, j, 0));
                    for slot in StencilSlot::LATERAL {
                        let o = slot.offset();
                        if let Some(kn) = column_top(top, i + o.x, j + o.y) {
                            builder.add(row, index(i + o.x, j + o.y, kn), surface.get(slot, i, j, 0));
                        }
                    }
                }
            }
        }
        builder.build()
    }
}
