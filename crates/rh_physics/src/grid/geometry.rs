// crates/rh_physics/src/grid/geometry.rs

//! 计算域几何
//!
//! 在结构化网格的全局盒内用掩码标记活动单元（域内单元）。
//! 每列最高的活动单元为该列的地表单元（top-of-domain），
//! 没有活动单元的列顶层索引为 `-1`。

use rh_foundation::{RhError, RhResult};

use super::Grid;
use crate::fields::Field;

/// 活动单元掩码
#[derive(Debug, Clone, PartialEq)]
pub struct DomainGeometry {
    extents: [i32; 3],
    mask: Vec<bool>,
    tops: Vec<i32>,
}

impl DomainGeometry {
    /// 整个网格盒都为活动单元
    pub fn full(grid: &Grid) -> Self {
        Self::from_fn(grid, |_, _, _| true)
    }

    /// 由判定函数构建
    pub fn from_fn(grid: &Grid, inside: impl Fn(i32, i32, i32) -> bool) -> Self {
        let extents = grid.extents();
        let mask = grid
            .global_range()
            .iter()
            .map(|(i, j, k)| inside(i, j, k))
            .collect();
        Self::with_mask(extents, mask)
    }

    /// 由掩码构建，x 最快变化
    pub fn from_mask(grid: &Grid, mask: Vec<bool>) -> RhResult<Self> {
        if mask.len() != grid.num_cells() {
            return Err(RhError::size_mismatch("geometry mask", grid.num_cells(), mask.len()));
        }
        Ok(Self::with_mask(grid.extents(), mask))
    }

    /// 由每列顶层索引构建（列内 `k <= top` 为活动单元）
    pub fn from_column_tops(grid: &Grid, tops: &[i32]) -> RhResult<Self> {
        let [nx, ny, nz] = grid.extents();
        let columns = (nx * ny) as usize;
        if tops.len() != columns {
            return Err(RhError::size_mismatch("column tops", columns, tops.len()));
        }
        if let Some(&bad) = tops.iter().find(|&&t| t < -1 || t >= nz) {
            return Err(RhError::out_of_range("column top", bad as f64, -1.0, (nz - 1) as f64));
        }
        Ok(Self::from_fn(grid, |i, j, k| k <= tops[(i + nx * j) as usize]))
    }

    fn with_mask(extents: [i32; 3], mask: Vec<bool>) -> Self {
        let [nx, ny, nz] = extents;
        let mut tops = vec![-1; (nx * ny) as usize];
        for j in 0..ny {
            for i in 0..nx {
                let column = (i + nx * j) as usize;
                tops[column] = (0..nz)
                    .rev()
                    .find(|&k| mask[(i + nx * (j + ny * k)) as usize])
                    .unwrap_or(-1);
            }
        }
        Self {
            extents,
            mask,
            tops,
        }
    }

    /// 单元是否在域内（全局盒外一律为域外）
    #[inline]
    pub fn is_inside(&self, i: i32, j: i32, k: i32) -> bool {
        let [nx, ny, nz] = self.extents;
        if i < 0 || j < 0 || k < 0 || i >= nx || j >= ny || k >= nz {
            return false;
        }
        self.mask[(i + nx * (j + ny * k)) as usize]
    }

    /// 列顶层索引，无活动单元或越界为 `-1`
    #[inline]
    pub fn top_index(&self, i: i32, j: i32) -> i32 {
        let [nx, ny, _] = self.extents;
        if i < 0 || j < 0 || i >= nx || j >= ny {
            return -1;
        }
        self.tops[(i + nx * j) as usize]
    }

    /// 活动单元数
    pub fn num_inside(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// 全局尺寸
    pub fn extents(&self) -> [i32; 3] {
        self.extents
    }

    /// 在地表网格上生成顶层索引场（幽灵层同样填充）
    pub fn top_field(&self, surface: &Grid) -> RhResult<Field<i32>> {
        let [nx, ny, _] = self.extents;
        let [sx, sy, _] = surface.extents();
        if (sx, sy) != (nx, ny) {
            return Err(RhError::invalid_grid(format!(
                "地表网格 {}×{} 与几何 {}×{} 不一致",
                sx, sy, nx, ny
            )));
        }
        Field::from_fn(surface, |i, j, _| self.top_index(i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_geometry_tops() {
        let grid = Grid::uniform([3, 2, 4], [1.0, 1.0, 1.0]).unwrap();
        let geom = DomainGeometry::full(&grid);
        assert_eq!(geom.num_inside(), 24);
        assert_eq!(geom.top_index(2, 1), 3);
        assert_eq!(geom.top_index(3, 1), -1);
        assert!(!geom.is_inside(0, 0, 4));
    }

    #[test]
    fn test_column_tops() {
        let grid = Grid::uniform([3, 1, 3], [1.0, 1.0, 1.0]).unwrap();
        let geom = DomainGeometry::from_column_tops(&grid, &[2, 0, -1]).unwrap();
        assert!(geom.is_inside(0, 0, 2));
        assert!(!geom.is_inside(1, 0, 1));
        assert!(!geom.is_inside(2, 0, 0));
        assert_eq!(geom.top_index(1, 0), 0);
        assert_eq!(geom.top_index(2, 0), -1);
        assert!(DomainGeometry::from_column_tops(&grid, &[3, 0, 0]).is_err());
        assert!(DomainGeometry::from_column_tops(&grid, &[0, 0]).is_err());
    }

    #[test]
    fn test_top_field_ghosts() {
        let grid = Grid::partitioned([4, 1, 2], [1.0, 1.0, 1.0], 2, 1).unwrap();
        let geom = DomainGeometry::from_column_tops(&grid, &[1, 1, 0, 1]).unwrap();
        let top = geom.top_field(&grid.surface()).unwrap();
        // 第二个子网格的西侧幽灵列来自第一个子网格
        assert_eq!(top.sub(1).get(1, 0, 0), 1);
        assert_eq!(top.sub(1).get(2, 0, 0), 0);
        assert_eq!(top.sub(0).get(-1, 0, 0), -1);
    }
}
