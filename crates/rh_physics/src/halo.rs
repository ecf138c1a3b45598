// crates/rh_physics/src/halo.rs

//! 幽灵层交换
//!
//! 组装过程中有三处同步点：压力、坡面通量与雅可比块本身。
//! 交换分两步：`begin_*` 从各拥有者打包幽灵值并返回句柄，
//! `finish_*` 消费句柄、写回幽灵层。两步之间可以做不依赖幽灵值的计算。
//!
//! [`LocalHaloExchange`] 是进程内实现：所有子网格在同一地址空间，
//! 按预先建立的交换计划直接从拥有者读取。跨进程的实现只需实现
//! [`HaloExchange`]，失败时返回 [`HaloError::PeerFailure`]，组装器不重试。
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::fields::Field;
//! use rh_physics::grid::Grid;
//! use rh_physics::halo::{HaloExchange, LocalHaloExchange};
//!
//! let grid = Grid::partitioned([4, 1, 1], [1.0, 1.0, 1.0], 2, 1).unwrap();
//! let halo = LocalHaloExchange::new(&grid).unwrap();
//! let mut field: Field<f64> = Field::new(&grid).unwrap();
//! field.sub_mut(0).set(1, 0, 0, 7.0);
//! halo.exchange_field(&mut field).unwrap();
//! assert_eq!(field.sub(1).get(1, 0, 0), 7.0);
//! ```

use rayon::prelude::*;
use rh_foundation::{GhostBox, RhResult};
use thiserror::Error;

use crate::fields::Field;
use crate::grid::Grid;
use crate::stencil::StencilMatrix;

// ============================================================
// 错误与句柄
// ============================================================

/// 幽灵交换错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HaloError {
    /// 交换对象的布局与计划不一致
    #[error("交换对象布局不一致: {0}")]
    LayoutMismatch(String),

    /// 对端失败
    #[error("对端交换失败: {0}")]
    PeerFailure(String),
}

/// 进行中的场交换：每个子网格待写入的 (下标, 值)
#[derive(Debug, Clone, PartialEq)]
pub struct HaloHandle<T> {
    updates: Vec<Vec<(usize, T)>>,
}

impl<T> HaloHandle<T> {
    /// 由打包好的更新创建
    pub fn new(updates: Vec<Vec<(usize, T)>>) -> Self {
        Self { updates }
    }

    /// 子网格数量
    pub fn num_subgrids(&self) -> usize {
        self.updates.len()
    }

    /// 拆出更新列表
    pub fn into_updates(self) -> Vec<Vec<(usize, T)>> {
        self.updates
    }
}

/// 进行中的矩阵交换，每行按 [`crate::stencil::StencilSlot::ALL`] 顺序
pub type MatrixHaloHandle = HaloHandle<[f64; 7]>;

// ============================================================
// 接口
// ============================================================

/// 幽灵层交换服务
pub trait HaloExchange: Send + Sync {
    /// 打包场的幽灵值
    fn begin_field<T: Copy + Default + Send + Sync>(
        &self,
        field: &Field<T>,
    ) -> Result<HaloHandle<T>, HaloError>;

    /// 写回场的幽灵值
    fn finish_field<T: Copy + Default + Send + Sync>(
        &self,
        handle: HaloHandle<T>,
        field: &mut Field<T>,
    ) -> Result<(), HaloError>;

    /// 打包矩阵的幽灵行
    fn begin_matrix(&self, matrix: &StencilMatrix) -> Result<MatrixHaloHandle, HaloError>;

    /// 写回矩阵的幽灵行
    fn finish_matrix(&self, handle: MatrixHaloHandle, matrix: &mut StencilMatrix) -> Result<(), HaloError>;

    /// 一次完成场交换
    fn exchange_field<T: Copy + Default + Send + Sync>(&self, field: &mut Field<T>) -> Result<(), HaloError> {
        let handle = self.begin_field(field)?;
        self.finish_field(handle, field)
    }

    /// 一次完成矩阵交换
    fn exchange_matrix(&self, matrix: &mut StencilMatrix) -> Result<(), HaloError> {
        let handle = self.begin_matrix(matrix)?;
        self.finish_matrix(handle, matrix)
    }
}

// ============================================================
// 进程内实现
// ============================================================

/// 一个幽灵单元的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GhostSource {
    dst: usize,
    owner: usize,
    src: usize,
}

/// 一种网格布局上的交换计划
#[derive(Debug, Clone, PartialEq)]
struct ExchangePlan {
    boxes: Vec<GhostBox>,
    sources: Vec<Vec<GhostSource>>,
}

impl ExchangePlan {
    fn build(grid: &Grid) -> RhResult<Self> {
        let boxes = grid
            .subgrids()
            .iter()
            .map(|s| s.ghost_box())
            .collect::<RhResult<Vec<_>>>()?;

        // 全局盒外的幽灵单元没有拥有者，保持原值
        let sources = boxes
            .iter()
            .map(|gbox| {
                gbox.storage()
                    .iter()
                    .filter(|&(i, j, k)| !gbox.owns(i, j, k))
                    .filter_map(|(i, j, k)| {
                        let owner = grid.owner_of(i, j, k)?;
                        Some(GhostSource {
                            dst: gbox.index(i, j, k),
                            owner,
                            src: boxes[owner].index(i, j, k),
                        })
                    })
                    .collect()
            })
            .collect();

        Ok(Self { boxes, sources })
    }

    fn matches<'a>(&self, boxes: impl ExactSizeIterator<Item = &'a GhostBox>) -> bool {
        boxes.len() == self.boxes.len() && boxes.zip(&self.boxes).all(|(a, b)| a == b)
    }

    fn num_ghosts(&self) -> usize {
        self.sources.iter().map(Vec::len).sum()
    }
}

/// 进程内幽灵交换
///
/// 同时持有三维网格与地表网格的计划，按交换对象的布局选择。
#[derive(Debug, Clone, PartialEq)]
pub struct LocalHaloExchange {
    volume: ExchangePlan,
    surface: ExchangePlan,
}

impl LocalHaloExchange {
    /// 为网格及其地表网格建立交换计划
    pub fn new(grid: &Grid) -> RhResult<Self> {
        let volume = ExchangePlan::build(grid)?;
        let surface = ExchangePlan::build(&grid.surface())?;
        log::debug!(
            "幽灵交换计划: 三维 {} 个幽灵单元, 地表 {} 个",
            volume.num_ghosts(),
            surface.num_ghosts()
        );
        Ok(Self { volume, surface })
    }

    fn plan_for<'a>(
        &self,
        boxes: impl ExactSizeIterator<Item = &'a GhostBox> + Clone,
    ) -> Result<&ExchangePlan, HaloError> {
        if self.volume.matches(boxes.clone()) {
            Ok(&self.volume)
        } else if self.surface.matches(boxes.clone()) {
            Ok(&self.surface)
        } else {
            Err(HaloError::LayoutMismatch(format!(
                "{} 个块与三维或地表网格都不一致",
                boxes.len()
            )))
        }
    }
}

/// 检查句柄与计划的子网格数一致
fn check_handle<T>(handle: &HaloHandle<T>, plan: &ExchangePlan) -> Result<(), HaloError> {
    if handle.num_subgrids() != plan.boxes.len() {
        return Err(HaloError::LayoutMismatch(format!(
            "句柄含 {} 个子网格, 计划为 {}",
            handle.num_subgrids(),
            plan.boxes.len()
        )));
    }
    Ok(())
}

impl HaloExchange for LocalHaloExchange {
    fn begin_field<T: Copy + Default + Send + Sync>(
        &self,
        field: &Field<T>,
    ) -> Result<HaloHandle<T>, HaloError> {
        let plan = self.plan_for(field.subs().iter().map(|s| s.gbox()))?;
        let updates = plan
            .sources
            .par_iter()
            .map(|sources| {
                sources
                    .iter()
                    .map(|g| (g.dst, field.sub(g.owner).data()[g.src]))
                    .collect()
            })
            .collect();
        Ok(HaloHandle::new(updates))
    }

    fn finish_field<T: Copy + Default + Send + Sync>(
        &self,
        handle: HaloHandle<T>,
        field: &mut Field<T>,
    ) -> Result<(), HaloError> {
        let plan = self.plan_for(field.subs().iter().map(|s| s.gbox()))?;
        check_handle(&handle, plan)?;
        field
            .subs_mut()
            .par_iter_mut()
            .zip(handle.into_updates())
            .for_each(|(sub, updates)| {
                let data = sub.data_mut();
                for (idx, value) in updates {
                    data[idx] = value;
                }
            });
        Ok(())
    }

    fn begin_matrix(&self, matrix: &StencilMatrix) -> Result<MatrixHaloHandle, HaloError> {
        let plan = self.plan_for(matrix.blocks().iter().map(|b| b.gbox()))?;
        let updates = plan
            .sources
            .par_iter()
            .map(|sources| {
                sources
                    .iter()
                    .map(|g| (g.dst, matrix.block(g.owner).row_at(g.src)))
                    .collect()
            })
            .collect();
        Ok(HaloHandle::new(updates))
    }

    fn finish_matrix(&self, handle: MatrixHaloHandle, matrix: &mut StencilMatrix) -> Result<(), HaloError> {
        let plan = self.plan_for(matrix.blocks().iter().map(|b| b.gbox()))?;
        check_handle(&handle, plan)?;
        matrix
            .blocks_mut()
            .par_iter_mut()
            .zip(handle.into_updates())
            .for_each(|(block, updates)| {
                for (idx, row) in updates {
                    block.set_row_at(idx, row);
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::{StencilShape, StencilSlot};

    #[test]
    fn test_field_exchange_fills_interior_ghosts() {
        let grid = Grid::partitioned([4, 4, 2], [1.0, 1.0, 1.0], 2, 2).unwrap();
        let halo = LocalHaloExchange::new(&grid).unwrap();
        let mut field: Field<f64> = Field::filled(&grid, -1.0).unwrap();
        for s in 0..field.num_subgrids() {
            let sub = field.sub_mut(s);
            let gbox = *sub.gbox();
            for (i, j, k) in gbox.owned() {
                sub.set(i, j, k, (100 * i + 10 * j + k) as f64);
            }
        }
        halo.exchange_field(&mut field).unwrap();

        // 子网格 3 拥有 (2..4, 2..4)，西南角幽灵单元来自子网格 0
        assert_eq!(field.sub(3).get(1, 1, 1), 111.0);
        assert_eq!(field.sub(3).get(1, 3, 0), 130.0);
        // 全局盒外保持原值
        assert_eq!(field.sub(3).get(4, 2, 0), -1.0);
        assert_eq!(field.sub(0).get(0, 0, -1), -1.0);
    }

    #[test]
    fn test_surface_field_uses_surface_plan() {
        let grid = Grid::partitioned([4, 2, 3], [1.0, 1.0, 1.0], 2, 1).unwrap();
        let halo = LocalHaloExchange::new(&grid).unwrap();
        let mut top: Field<i32> = Field::filled(&grid.surface(), 0).unwrap();
        top.sub_mut(1).set(2, 1, 0, 5);
        halo.exchange_field(&mut top).unwrap();
        assert_eq!(top.sub(0).get(2, 1, 0), 5);
    }

    #[test]
    fn test_matrix_exchange_copies_rows() {
        let grid = Grid::partitioned([4, 1, 1], [1.0, 1.0, 1.0], 2, 1).unwrap();
        let halo = LocalHaloExchange::new(&grid).unwrap();
        let mut m = StencilMatrix::new(&grid, StencilShape::Seven).unwrap();
        m.block_mut(1).set(StencilSlot::West, 2, 0, 0, -3.0);
        m.block_mut(1).set(StencilSlot::Center, 2, 0, 0, 6.0);
        halo.exchange_matrix(&mut m).unwrap();
        assert_eq!(m.block(0).get(StencilSlot::West, 2, 0, 0), -3.0);
        assert_eq!(m.block(0).get(StencilSlot::Center, 2, 0, 0), 6.0);
    }

    #[test]
    fn test_layout_mismatch() {
        let grid = Grid::partitioned([4, 1, 1], [1.0, 1.0, 1.0], 2, 1).unwrap();
        let other = Grid::uniform([4, 1, 1], [1.0, 1.0, 1.0]).unwrap();
        let halo = LocalHaloExchange::new(&grid).unwrap();
        let mut field: Field<f64> = Field::new(&other).unwrap();
        assert!(matches!(
            halo.exchange_field(&mut field),
            Err(HaloError::LayoutMismatch(_))
        ));
    }
}
