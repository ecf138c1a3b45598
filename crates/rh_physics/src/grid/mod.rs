// crates/rh_physics/src/grid/mod.rs

//! 结构化网格与子网格划分
//!
//! 计算域是一个轴对齐的三维长方体，在 x–y 平面上切分为若干子网格，
//! z 方向不切分。每个子网格记录自己拥有单元的全局起点、尺寸与间距，
//! 逐单元数组按子网格分块存储（见 [`crate::fields`]）。
//!
//! 地表网格与三维网格共享 x–y 划分，`nz = 1`。
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::grid::Grid;
//!
//! let grid = Grid::partitioned([8, 6, 4], [1.0, 1.0, 0.5], 2, 1).unwrap();
//! assert_eq!(grid.num_subgrids(), 2);
//! assert_eq!(grid.owner_of_column(5, 3), Some(1));
//! let surface = grid.surface();
//! assert_eq!(surface.extents(), [8, 6, 1]);
//! ```

pub mod geometry;

pub use geometry::DomainGeometry;

use rh_foundation::{CellRange, GhostBox, RhError, RhResult};
use serde::{Deserialize, Serialize};

/// 逐单元数组的幽灵层宽度
pub const GHOST_WIDTH: i32 = 1;

// ============================================================
// 子网格
// ============================================================

/// 子网格：一个进程（或一个并行块）拥有的单元盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subgrid {
    /// 在网格中的序号
    pub index: usize,
    /// 全局起点 x
    pub ix: i32,
    /// 全局起点 y
    pub iy: i32,
    /// 全局起点 z
    pub iz: i32,
    /// x 方向单元数
    pub nx: i32,
    /// y 方向单元数
    pub ny: i32,
    /// z 方向单元数
    pub nz: i32,
    /// x 方向间距
    pub dx: f64,
    /// y 方向间距
    pub dy: f64,
    /// z 方向间距
    pub dz: f64,
}

impl Subgrid {
    /// 带幽灵层的索引盒
    pub fn ghost_box(&self) -> RhResult<GhostBox> {
        GhostBox::new(
            [self.ix, self.iy, self.iz],
            [self.nx, self.ny, self.nz],
            GHOST_WIDTH,
        )
    }

    /// 拥有单元范围
    pub fn owned(&self) -> CellRange {
        CellRange::new(
            [self.ix, self.iy, self.iz],
            [self.ix + self.nx, self.iy + self.ny, self.iz + self.nz],
        )
    }

    /// 是否拥有单元
    #[inline]
    pub fn owns(&self, i: i32, j: i32, k: i32) -> bool {
        self.owned().contains(i, j, k)
    }

    /// 是否拥有该列
    #[inline]
    pub fn owns_column(&self, i: i32, j: i32) -> bool {
        i >= self.ix && i < self.ix + self.nx && j >= self.iy && j < self.iy + self.ny
    }

    /// 单元体积（不含层厚乘子）
    #[inline]
    pub fn cell_volume(&self) -> f64 {
        self.dx * self.dy * self.dz
    }
}

// ============================================================
// 网格
// ============================================================

/// 均匀间距的结构化网格
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    extents: [i32; 3],
    spacing: [f64; 3],
    x_splits: Vec<i32>,
    y_splits: Vec<i32>,
    subgrids: Vec<Subgrid>,
}

impl Grid {
    /// 单个子网格的网格
    pub fn uniform(extents: [i32; 3], spacing: [f64; 3]) -> RhResult<Self> {
        Self::partitioned(extents, spacing, 1, 1)
    }

    /// 在 x–y 平面上切分为 `px × py` 个子网格
    ///
    /// 每个方向尽量均分，余数分给靠前的子网格。
    pub fn partitioned(extents: [i32; 3], spacing: [f64; 3], px: i32, py: i32) -> RhResult<Self> {
        if extents.iter().any(|&n| n <= 0) {
            return Err(RhError::invalid_grid(format!("网格尺寸必须为正: {:?}", extents)));
        }
        if spacing.iter().any(|&h| !(h > 0.0 && h.is_finite())) {
            return Err(RhError::invalid_grid(format!("网格间距必须为正: {:?}", spacing)));
        }
        if px <= 0 || py <= 0 || px > extents[0] || py > extents[1] {
            return Err(RhError::invalid_grid(format!(
                "无法将 {}×{} 列切分为 {}×{} 个子网格",
                extents[0], extents[1], px, py
            )));
        }

        let x_splits = split_axis(extents[0], px);
        let y_splits = split_axis(extents[1], py);

        let mut subgrids = Vec::with_capacity((px * py) as usize);
        for sj in 0..py as usize {
            for si in 0..px as usize {
                subgrids.push(Subgrid {
                    index: subgrids.len(),
                    ix: x_splits[si],
                    iy: y_splits[sj],
                    iz: 0,
                    nx: x_splits[si + 1] - x_splits[si],
                    ny: y_splits[sj + 1] - y_splits[sj],
                    nz: extents[2],
                    dx: spacing[0],
                    dy: spacing[1],
                    dz: spacing[2],
                });
            }
        }

        Ok(Self {
            extents,
            spacing,
            x_splits,
            y_splits,
            subgrids,
        })
    }

    /// 与本网格共享 x–y 划分的地表网格（`nz = 1`）
    pub fn surface(&self) -> Grid {
        let subgrids = self
            .subgrids
            .iter()
            .map(|s| Subgrid { iz: 0, nz: 1, ..*s })
            .collect();
        Grid {
            extents: [self.extents[0], self.extents[1], 1],
            spacing: self.spacing,
            x_splits: self.x_splits.clone(),
            y_splits: self.y_splits.clone(),
            subgrids,
        }
    }

    /// 全局尺寸
    #[inline]
    pub fn extents(&self) -> [i32; 3] {
        self.extents
    }

    /// 网格间距
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 全部子网格
    #[inline]
    pub fn subgrids(&self) -> &[Subgrid] {
        &self.subgrids
    }

    /// 子网格数量
    #[inline]
    pub fn num_subgrids(&self) -> usize {
        self.subgrids.len()
    }

    /// 单元总数
    pub fn num_cells(&self) -> usize {
        self.extents.iter().map(|&n| n as usize).product()
    }

    /// 全局单元范围
    pub fn global_range(&self) -> CellRange {
        CellRange::new([0, 0, 0], self.extents)
    }

    /// 坐标是否在全局盒内
    #[inline]
    pub fn contains(&self, i: i32, j: i32, k: i32) -> bool {
        self.global_range().contains(i, j, k)
    }

    /// 拥有该列的子网格
    pub fn owner_of_column(&self, i: i32, j: i32) -> Option<usize> {
        let si = find_segment(&self.x_splits, i)?;
        let sj = find_segment(&self.y_splits, j)?;
        Some(sj * (self.x_splits.len() - 1) + si)
    }

    /// 拥有该单元的子网格
    pub fn owner_of(&self, i: i32, j: i32, k: i32) -> Option<usize> {
        if k < 0 || k >= self.extents[2] {
            return None;
        }
        self.owner_of_column(i, j)
    }
}

fn split_axis(n: i32, parts: i32) -> Vec<i32> {
    let base = n / parts;
    let rem = n % parts;
    let mut splits = Vec::with_capacity(parts as usize + 1);
    let mut pos = 0;
    splits.push(pos);
    for p in 0..parts {
        pos += base + if p < rem { 1 } else { 0 };
        splits.push(pos);
    }
    splits
}

fn find_segment(splits: &[i32], x: i32) -> Option<usize> {
    let last = *splits.last()?;
    if x < 0 || x >= last {
        return None;
    }
    // splits 严格递增，partition_point 给出第一个大于 x 的分割点
    Some(splits.partition_point(|&s| s <= x) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_axis_balances_remainder() {
        assert_eq!(split_axis(10, 3), vec![0, 4, 7, 10]);
        assert_eq!(split_axis(4, 4), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_partition_tiles_domain() {
        let grid = Grid::partitioned([7, 5, 3], [1.0, 2.0, 0.5], 3, 2).unwrap();
        assert_eq!(grid.num_subgrids(), 6);
        let owned: usize = grid.subgrids().iter().map(|s| s.owned().len()).sum();
        assert_eq!(owned, grid.num_cells());
        for s in grid.subgrids() {
            for (i, j, k) in s.owned() {
                assert_eq!(grid.owner_of(i, j, k), Some(s.index));
            }
        }
    }

    #[test]
    fn test_owner_outside_domain() {
        let grid = Grid::uniform([4, 4, 2], [1.0, 1.0, 1.0]).unwrap();
        assert_eq!(grid.owner_of_column(-1, 0), None);
        assert_eq!(grid.owner_of_column(4, 0), None);
        assert_eq!(grid.owner_of(0, 0, 2), None);
        assert_eq!(grid.owner_of(3, 3, 1), Some(0));
    }

    #[test]
    fn test_invalid_grid() {
        assert!(Grid::uniform([0, 1, 1], [1.0, 1.0, 1.0]).is_err());
        assert!(Grid::uniform([1, 1, 1], [1.0, -1.0, 1.0]).is_err());
        assert!(Grid::partitioned([2, 2, 1], [1.0, 1.0, 1.0], 3, 1).is_err());
    }

    #[test]
    fn test_surface_grid_shares_partition() {
        let grid = Grid::partitioned([6, 4, 5], [1.0, 1.0, 0.2], 2, 2).unwrap();
        let surface = grid.surface();
        assert_eq!(surface.num_subgrids(), 4);
        for (a, b) in grid.subgrids().iter().zip(surface.subgrids()) {
            assert_eq!((a.ix, a.iy, a.nx, a.ny), (b.ix, b.iy, b.nx, b.ny));
            assert_eq!(b.nz, 1);
        }
    }
}
