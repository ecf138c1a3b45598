// crates/rh_physics/src/fields.rs

//! 分块逐单元场
//!
//! `Field<T>` 按子网格分块存储，每块是一个带一层幽灵单元的稠密数组，
//! 以全局坐标 `(i, j, k)` 访问。三维场与地表场使用同一种结构，
//! 地表场建立在 `nz = 1` 的地表网格上，只在 `k = 0` 处取值。
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::fields::Field;
//! use rh_physics::grid::Grid;
//!
//! let grid = Grid::partitioned([4, 2, 2], [1.0, 1.0, 1.0], 2, 1).unwrap();
//! let mut pressure = Field::from_fn(&grid, |i, _, k| (i + k) as f64).unwrap();
//! assert_eq!(pressure.num_subgrids(), 2);
//! assert_eq!(pressure.sub(1).get(1, 0, 0), 1.0); // 西侧幽灵层
//! pressure.sub_mut(0).set(0, 0, 0, -2.0);
//! assert_eq!(pressure.value_at(&grid, 0, 0, 0), Some(-2.0));
//! ```

use rayon::prelude::*;
use rh_foundation::{GhostBox, RhError, RhResult};

use crate::grid::Grid;

// ============================================================
// 子网格块
// ============================================================

/// 单个子网格上的场数据
#[derive(Debug, Clone, PartialEq)]
pub struct SubField<T = f64> {
    gbox: GhostBox,
    data: Vec<T>,
}

impl<T: Copy + Default> SubField<T> {
    /// 以默认值创建
    pub fn new(gbox: GhostBox) -> Self {
        Self::filled(gbox, T::default())
    }

    /// 以给定值创建
    pub fn filled(gbox: GhostBox, value: T) -> Self {
        Self {
            data: vec![value; gbox.len()],
            gbox,
        }
    }

    /// 索引盒
    #[inline]
    pub fn gbox(&self) -> &GhostBox {
        &self.gbox
    }

    /// 读取
    #[inline]
    pub fn get(&self, i: i32, j: i32, k: i32) -> T {
        self.data[self.gbox.index(i, j, k)]
    }

    /// 写入
    #[inline]
    pub fn set(&mut self, i: i32, j: i32, k: i32, value: T) {
        let idx = self.gbox.index(i, j, k);
        self.data[idx] = value;
    }

    /// 可变引用
    #[inline]
    pub fn get_mut(&mut self, i: i32, j: i32, k: i32) -> &mut T {
        let idx = self.gbox.index(i, j, k);
        &mut self.data[idx]
    }

    /// 越界时返回 `None` 的读取
    #[inline]
    pub fn try_get(&self, i: i32, j: i32, k: i32) -> Option<T> {
        self.gbox.try_index(i, j, k).map(|idx| self.data[idx])
    }

    /// 越界时返回 `None` 的可变引用
    #[inline]
    pub fn try_get_mut(&mut self, i: i32, j: i32, k: i32) -> Option<&mut T> {
        let idx = self.gbox.try_index(i, j, k)?;
        Some(&mut self.data[idx])
    }

    /// 原始数据
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// 原始数据（可变）
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// 全部置为给定值
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl SubField<f64> {
    /// 累加
    #[inline]
    pub fn add(&mut self, i: i32, j: i32, k: i32, value: f64) {
        let idx = self.gbox.index(i, j, k);
        self.data[idx] += value;
    }
}

// ============================================================
// 分块场
// ============================================================

/// 按子网格分块的逐单元场
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T = f64> {
    subs: Vec<SubField<T>>,
}

impl<T: Copy + Default + Send + Sync> Field<T> {
    /// 以默认值创建
    pub fn new(grid: &Grid) -> RhResult<Self> {
        Self::filled(grid, T::default())
    }

    /// 以给定值创建
    pub fn filled(grid: &Grid, value: T) -> RhResult<Self> {
        let subs = grid
            .subgrids()
            .iter()
            .map(|s| Ok(SubField::filled(s.ghost_box()?, value)))
            .collect::<RhResult<Vec<_>>>()?;
        Ok(Self { subs })
    }

    /// 以全局坐标函数填充，幽灵层同样求值
    pub fn from_fn(grid: &Grid, f: impl Fn(i32, i32, i32) -> T + Sync) -> RhResult<Self> {
        let mut field = Self::new(grid)?;
        field.subs.par_iter_mut().for_each(|sub| {
            let gbox = sub.gbox;
            for (idx, (i, j, k)) in gbox.storage().iter().enumerate() {
                sub.data[idx] = f(i, j, k);
            }
        });
        Ok(field)
    }

    /// 子网格数量
    #[inline]
    pub fn num_subgrids(&self) -> usize {
        self.subs.len()
    }

    /// 第 `s` 个子网格块
    #[inline]
    pub fn sub(&self, s: usize) -> &SubField<T> {
        &self.subs[s]
    }

    /// 第 `s` 个子网格块（可变）
    #[inline]
    pub fn sub_mut(&mut self, s: usize) -> &mut SubField<T> {
        &mut self.subs[s]
    }

    /// 全部块
    #[inline]
    pub fn subs(&self) -> &[SubField<T>] {
        &self.subs
    }

    /// 全部块（可变）
    #[inline]
    pub fn subs_mut(&mut self) -> &mut [SubField<T>] {
        &mut self.subs
    }

    /// 全部置为给定值
    pub fn fill(&mut self, value: T) {
        self.subs.par_iter_mut().for_each(|s| s.fill(value));
    }

    /// 布局是否与网格一致
    pub fn matches(&self, grid: &Grid) -> bool {
        self.subs.len() == grid.num_subgrids()
            && self
                .subs
                .iter()
                .zip(grid.subgrids())
                .all(|(sub, s)| s.ghost_box().map(|b| b == sub.gbox).unwrap_or(false))
    }

    /// 校验布局，不一致时返回错误
    pub fn check_layout(&self, grid: &Grid, name: &'static str) -> RhResult<()> {
        if self.matches(grid) {
            Ok(())
        } else {
            Err(RhError::invalid_input(format!("场 {} 与网格布局不一致", name)))
        }
    }

    /// 从同布局的另一个场复制（含幽灵层）
    pub fn copy_from(&mut self, other: &Field<T>) -> RhResult<()> {
        if self.subs.len() != other.subs.len() {
            return Err(RhError::size_mismatch("field blocks", self.subs.len(), other.subs.len()));
        }
        for (dst, src) in self.subs.iter_mut().zip(&other.subs) {
            if dst.gbox != src.gbox {
                return Err(RhError::invalid_input("复制的场布局不一致"));
            }
            dst.data.copy_from_slice(&src.data);
        }
        Ok(())
    }

    /// 按全局坐标读取拥有者上的值
    pub fn value_at(&self, grid: &Grid, i: i32, j: i32, k: i32) -> Option<T> {
        let owner = grid.owner_of_column(i, j)?;
        let sub = self.subs.get(owner)?;
        if sub.gbox.owns(i, j, k) {
            Some(sub.get(i, j, k))
        } else {
            None
        }
    }
}

impl Field<f64> {
    /// 拥有单元上的最大绝对值
    pub fn max_abs_owned(&self) -> f64 {
        self.subs
            .iter()
            .flat_map(|s| s.gbox.owned().iter().map(move |(i, j, k)| s.get(i, j, k).abs()))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_fn_fills_ghosts() {
        let grid = Grid::uniform([2, 2, 2], [1.0, 1.0, 1.0]).unwrap();
        let field = Field::from_fn(&grid, |i, j, k| (100 * i + 10 * j + k) as f64).unwrap();
        assert_eq!(field.sub(0).get(-1, 0, 0), -100.0);
        assert_eq!(field.sub(0).get(2, 2, 2), 222.0);
        assert!(field.matches(&grid));
    }

    #[test]
    fn test_layout_mismatch() {
        let a = Grid::uniform([2, 2, 2], [1.0, 1.0, 1.0]).unwrap();
        let b = Grid::partitioned([2, 2, 2], [1.0, 1.0, 1.0], 2, 1).unwrap();
        let field: Field<f64> = Field::new(&a).unwrap();
        assert!(!field.matches(&b));
        assert!(field.check_layout(&b, "pressure").is_err());
        let mut other: Field<f64> = Field::new(&b).unwrap();
        assert!(other.copy_from(&field).is_err());
    }

    #[test]
    fn test_value_at_owner() {
        let grid = Grid::partitioned([4, 1, 1], [1.0, 1.0, 1.0], 2, 1).unwrap();
        let mut field: Field<f64> = Field::new(&grid).unwrap();
        field.sub_mut(1).set(3, 0, 0, 5.0);
        field.sub_mut(0).set(2, 0, 0, 7.0); // 幽灵单元，不是拥有者
        assert_eq!(field.value_at(&grid, 3, 0, 0), Some(5.0));
        assert_eq!(field.value_at(&grid, 2, 0, 0), Some(0.0));
        assert_eq!(field.value_at(&grid, 4, 0, 0), None);
        assert_eq!(field.max_abs_owned(), 5.0);
    }

    #[test]
    fn test_integer_field() {
        let grid = Grid::uniform([3, 3, 1], [1.0, 1.0, 1.0]).unwrap();
        let mut top: Field<i32> = Field::filled(&grid, -1).unwrap();
        top.sub_mut(0).set(1, 1, 0, 4);
        assert_eq!(top.sub(0).try_get(1, 1, 0), Some(4));
        assert_eq!(top.sub(0).try_get(5, 1, 0), None);
    }
}
