// crates/rh_physics/src/stencil.rs

//! 模板矩阵
//!
//! 结构化网格上的稀疏算子按“每个模板偏移一个槽位”存储：
//! 单元 `c` 对偏移 `d` 的系数位于槽位 `d` 的缓冲区中、与 `c` 相同的 `(i, j, k)` 处。
//! 地下算子使用 7 点模板，地表算子使用 5 点模板（没有上下槽位）。
//!
//! 对称存储时只有中心、东、北、上四个槽位有意义，
//! 西/南/下系数由相邻单元的东/北/上系数镜像得到（见 [`StencilMatrix::mirrored`]）。
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::grid::Grid;
//! use rh_physics::stencil::{StencilMatrix, StencilShape, StencilSlot};
//!
//! let grid = Grid::uniform([2, 1, 1], [1.0, 1.0, 1.0]).unwrap();
//! let mut m = StencilMatrix::new(&grid, StencilShape::Seven).unwrap();
//! m.block_mut(0).set(StencilSlot::East, 0, 0, 0, -1.5);
//! assert_eq!(m.entry(&grid, StencilSlot::East, 0, 0, 0), -1.5);
//! assert_eq!(StencilSlot::East.opposite(), StencilSlot::West);
//! ```

use glam::IVec3;
use rayon::prelude::*;
use rh_foundation::{GhostBox, RhResult};

use crate::grid::Grid;

// ============================================================
// 模板槽位
// ============================================================

/// 模板槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum StencilSlot {
    /// 对角
    Center = 0,
    /// 西 (-x)
    West = 1,
    /// 东 (+x)
    East = 2,
    /// 南 (-y)
    South = 3,
    /// 北 (+y)
    North = 4,
    /// 下 (-z)
    Lower = 5,
    /// 上 (+z)
    Upper = 6,
}

impl StencilSlot {
    /// 7 点模板的全部槽位
    pub const ALL: [StencilSlot; 7] = [
        Self::Center,
        Self::West,
        Self::East,
        Self::South,
        Self::North,
        Self::Lower,
        Self::Upper,
    ];

    /// 四个侧向槽位
    pub const LATERAL: [StencilSlot; 4] = [Self::West, Self::East, Self::South, Self::North];

    /// 六个邻居槽位
    pub const NEIGHBORS: [StencilSlot; 6] = [
        Self::West,
        Self::East,
        Self::South,
        Self::North,
        Self::Lower,
        Self::Upper,
    ];

    /// 槽位序号
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// 对应的网格偏移
    #[inline]
    pub fn offset(self) -> IVec3 {
        match self {
            Self::Center => IVec3::ZERO,
            Self::West => IVec3::NEG_X,
            Self::East => IVec3::X,
            Self::South => IVec3::NEG_Y,
            Self::North => IVec3::Y,
            Self::Lower => IVec3::NEG_Z,
            Self::Upper => IVec3::Z,
        }
    }

    /// 由单位方向得到槽位
    pub fn from_direction(dir: IVec3) -> Option<Self> {
        Self::NEIGHBORS.into_iter().find(|s| s.offset() == dir)
    }

    /// 相反方向的槽位
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Self::Center => Self::Center,
            Self::West => Self::East,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::North => Self::South,
            Self::Lower => Self::Upper,
            Self::Upper => Self::Lower,
        }
    }

    /// 对称存储中保留的槽位（中心、东、北、上）
    #[inline]
    pub fn is_stored_in_symmetric(self) -> bool {
        matches!(self, Self::Center | Self::East | Self::North | Self::Upper)
    }
}

/// 模板形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilShape {
    /// 中心 + 六个轴向邻居
    Seven,
    /// 中心 + 四个侧向邻居
    Five,
}

impl StencilShape {
    /// 槽位数量
    #[inline]
    pub fn num_slots(self) -> usize {
        match self {
            Self::Seven => 7,
            Self::Five => 5,
        }
    }

    /// 该形状包含的槽位
    pub fn slots(self) -> &'static [StencilSlot] {
        &StencilSlot::ALL[..self.num_slots()]
    }

    /// 是否包含槽位
    #[inline]
    pub fn has(self, slot: StencilSlot) -> bool {
        slot.index() < self.num_slots()
    }
}

// ============================================================
// 子网格块
// ============================================================

/// 单个子网格上的模板系数
#[derive(Debug, Clone, PartialEq)]
pub struct StencilBlock {
    gbox: GhostBox,
    shape: StencilShape,
    coeffs: Vec<Vec<f64>>,
}

impl StencilBlock {
    /// 创建全零块
    pub fn new(gbox: GhostBox, shape: StencilShape) -> Self {
        Self {
            coeffs: vec![vec![0.0; gbox.len()]; shape.num_slots()],
            gbox,
            shape,
        }
    }

    /// 索引盒
    #[inline]
    pub fn gbox(&self) -> &GhostBox {
        &self.gbox
    }

    /// 模板形状
    #[inline]
    pub fn shape(&self) -> StencilShape {
        self.shape
    }

    /// 读取系数，形状中不存在的槽位返回 0
    #[inline]
    pub fn get(&self, slot: StencilSlot, i: i32, j: i32, k: i32) -> f64 {
        if !self.shape.has(slot) {
            return 0.0;
        }
        self.coeffs[slot.index()][self.gbox.index(i, j, k)]
    }

    /// 写入系数
    #[inline]
    pub fn set(&mut self, slot: StencilSlot, i: i32, j: i32, k: i32, value: f64) {
        debug_assert!(self.shape.has(slot), "{:?} 模板没有槽位 {:?}", self.shape, slot);
        let idx = self.gbox.index(i, j, k);
        self.coeffs[slot.index()][idx] = value;
    }

    /// 累加系数
    #[inline]
    pub fn add(&mut self, slot: StencilSlot, i: i32, j: i32, k: i32, value: f64) {
        debug_assert!(self.shape.has(slot), "{:?} 模板没有槽位 {:?}", self.shape, slot);
        let idx = self.gbox.index(i, j, k);
        self.coeffs[slot.index()][idx] += value;
    }

    /// 取出系数并置零
    #[inline]
    pub fn take(&mut self, slot: StencilSlot, i: i32, j: i32, k: i32) -> f64 {
        let idx = self.gbox.index(i, j, k);
        std::mem::take(&mut self.coeffs[slot.index()][idx])
    }

    /// 槽位缓冲区
    #[inline]
    pub fn slot(&self, slot: StencilSlot) -> &[f64] {
        &self.coeffs[slot.index()]
    }

    /// 槽位缓冲区（可变）
    #[inline]
    pub fn slot_mut(&mut self, slot: StencilSlot) -> &mut [f64] {
        &mut self.coeffs[slot.index()]
    }

    /// 一行的全部系数，按 [`StencilSlot::ALL`] 顺序
    pub fn row(&self, i: i32, j: i32, k: i32) -> [f64; 7] {
        let mut row = [0.0; 7];
        for slot in self.shape.slots() {
            row[slot.index()] = self.get(*slot, i, j, k);
        }
        row
    }

    /// 按线性下标读取一行
    pub fn row_at(&self, idx: usize) -> [f64; 7] {
        let mut row = [0.0; 7];
        for (s, buf) in self.coeffs.iter().enumerate() {
            row[s] = buf[idx];
        }
        row
    }

    /// 按线性下标写入一行，形状外的槽位忽略
    pub fn set_row_at(&mut self, idx: usize, row: [f64; 7]) {
        for (s, buf) in self.coeffs.iter_mut().enumerate() {
            buf[idx] = row[s];
        }
    }

    /// 将一行设为单位行
    pub fn set_identity_row(&mut self, i: i32, j: i32, k: i32) {
        let idx = self.gbox.index(i, j, k);
        for (s, buf) in self.coeffs.iter_mut().enumerate() {
            buf[idx] = if s == StencilSlot::Center.index() { 1.0 } else { 0.0 };
        }
    }

    /// 全部清零
    pub fn clear(&mut self) {
        for buf in &mut self.coeffs {
            buf.fill(0.0);
        }
    }
}

// ============================================================
// 分块模板矩阵
// ============================================================

/// 按子网格分块的模板矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct StencilMatrix {
    shape: StencilShape,
    symmetric: bool,
    blocks: Vec<StencilBlock>,
}

impl StencilMatrix {
    /// 创建全零矩阵
    pub fn new(grid: &Grid, shape: StencilShape) -> RhResult<Self> {
        let blocks = grid
            .subgrids()
            .iter()
            .map(|s| Ok(StencilBlock::new(s.ghost_box()?, shape)))
            .collect::<RhResult<Vec<_>>>()?;
        Ok(Self {
            shape,
            symmetric: false,
            blocks,
        })
    }

    /// 模板形状
    #[inline]
    pub fn shape(&self) -> StencilShape {
        self.shape
    }

    /// 是否为对称存储
    #[inline]
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// 设置对称存储标记
    pub fn set_symmetric(&mut self, symmetric: bool) {
        self.symmetric = symmetric;
    }

    /// 块数量
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// 第 `s` 块
    #[inline]
    pub fn block(&self, s: usize) -> &StencilBlock {
        &self.blocks[s]
    }

    /// 第 `s` 块（可变）
    #[inline]
    pub fn block_mut(&mut self, s: usize) -> &mut StencilBlock {
        &mut self.blocks[s]
    }

    /// 全部块
    #[inline]
    pub fn blocks(&self) -> &[StencilBlock] {
        &self.blocks
    }

    /// 全部块（可变）
    #[inline]
    pub fn blocks_mut(&mut self) -> &mut [StencilBlock] {
        &mut self.blocks
    }

    /// 全部清零并取消对称标记
    pub fn clear(&mut self) {
        self.symmetric = false;
        self.blocks.par_iter_mut().for_each(StencilBlock::clear);
    }

    /// 按全局坐标读取拥有者上的系数，无拥有者返回 0
    pub fn entry(&self, grid: &Grid, slot: StencilSlot, i: i32, j: i32, k: i32) -> f64 {
        grid.owner_of_column(i, j)
            .and_then(|s| self.blocks.get(s))
            .filter(|b| b.gbox.owns(i, j, k))
            .map(|b| b.get(slot, i, j, k))
            .unwrap_or(0.0)
    }

    /// 由对称存储重建完整矩阵
    ///
    /// 西/南/下系数取自西/南/下邻居的东/北/上系数，需要幽灵层已交换。
    /// 非对称存储时直接复制。
    pub fn mirrored(&self) -> StencilMatrix {
        let mut full = self.clone();
        if !self.symmetric {
            return full;
        }
        full.symmetric = false;
        full.blocks.par_iter_mut().for_each(|block| {
            let gbox = block.gbox;
            for (i, j, k) in gbox.storage().iter() {
                for slot in [StencilSlot::West, StencilSlot::South, StencilSlot::Lower] {
                    if !block.shape.has(slot) {
                        continue;
                    }
                    let n = IVec3::new(i, j, k) + slot.offset();
                    let value = if gbox.contains(n.x, n.y, n.z) {
                        block.get(slot.opposite(), n.x, n.y, n.z)
                    } else {
                        0.0
                    };
                    block.set(slot, i, j, k, value);
                }
            }
        });
        full
    }

    /// 拥有单元上的最大行绝对值和（无穷范数）
    pub fn infinity_norm(&self) -> f64 {
        self.blocks
            .iter()
            .flat_map(|b| {
                b.gbox.owned().iter().map(move |(i, j, k)| {
                    b.row(i, j, k).iter().map(|v| v.abs()).sum::<f64>()
                })
            })
            .fold(0.0, f64::max)
    }

    /// 拥有单元上非零系数个数
    pub fn nnz(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| {
                b.gbox
                    .owned()
                    .iter()
                    .map(|(i, j, k)| b.row(i, j, k).iter().filter(|v| **v != 0.0).count())
                    .sum::<usize>()
            })
            .sum()
    }
}
