// crates/rh_foundation/src/index.rs

//! 带幽灵层的跨步索引
//!
//! 结构化网格上的所有逐单元数组（场、模板矩阵的每个槽位）都按同一种布局存储：
//! 子网格拥有的单元外加一圈宽度为 `ghost` 的幽灵层，x 方向最快变化。
//! `GhostBox` 集中完成全局坐标 `(i, j, k)` 到线性下标的换算，
//! 调试构建下对每次访问做越界检查。
//!
//! # 示例
//!
//! ```
//! use rh_foundation::index::GhostBox;
//!
//! let gbox = GhostBox::new([0, 0, 0], [4, 3, 2], 1).unwrap();
//! assert_eq!(gbox.dims(), [6, 5, 4]);
//! assert_eq!(gbox.index(-1, -1, -1), 0);
//! assert_eq!(gbox.index(0, -1, -1), 1);
//! assert_eq!(gbox.index(1, 0, 0) - gbox.index(0, 0, 0), 1);
//! assert_eq!(gbox.stride_y(), 6);
//! assert!(gbox.owns(3, 2, 1));
//! assert!(!gbox.owns(4, 2, 1));
//! assert!(gbox.contains(4, 2, 1));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RhError, RhResult};

// ============================================================================
// 单元范围
// ============================================================================

/// 半开的三维坐标范围 `[lo, hi)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// 下界（含）
    pub lo: [i32; 3],
    /// 上界（不含）
    pub hi: [i32; 3],
}

impl CellRange {
    /// 创建范围
    pub fn new(lo: [i32; 3], hi: [i32; 3]) -> Self {
        Self { lo, hi }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        (0..3).any(|d| self.hi[d] <= self.lo[d])
    }

    /// 单元数量
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (0..3)
            .map(|d| (self.hi[d] - self.lo[d]) as usize)
            .product()
    }

    /// 是否包含坐标
    #[inline]
    pub fn contains(&self, i: i32, j: i32, k: i32) -> bool {
        i >= self.lo[0]
            && i < self.hi[0]
            && j >= self.lo[1]
            && j < self.hi[1]
            && k >= self.lo[2]
            && k < self.hi[2]
    }

    /// 与另一范围的交集
    pub fn intersect(&self, other: &CellRange) -> CellRange {
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for d in 0..3 {
            lo[d] = self.lo[d].max(other.lo[d]);
            hi[d] = self.hi[d].min(other.hi[d]);
        }
        CellRange { lo, hi }
    }

    /// 按 x 最快、z 最慢的顺序遍历
    pub fn iter(&self) -> CellRangeIter {
        CellRangeIter {
            range: *self,
            next: if self.is_empty() { None } else { Some(self.lo) },
        }
    }
}

impl IntoIterator for CellRange {
    type Item = (i32, i32, i32);
    type IntoIter = CellRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// [`CellRange`] 的迭代器
#[derive(Debug, Clone)]
pub struct CellRangeIter {
    range: CellRange,
    next: Option<[i32; 3]>,
}

impl Iterator for CellRangeIter {
    type Item = (i32, i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        let mut n = cur;
        n[0] += 1;
        if n[0] >= self.range.hi[0] {
            n[0] = self.range.lo[0];
            n[1] += 1;
            if n[1] >= self.range.hi[1] {
                n[1] = self.range.lo[1];
                n[2] += 1;
            }
        }
        self.next = if n[2] < self.range.hi[2] { Some(n) } else { None };
        Some((cur[0], cur[1], cur[2]))
    }
}

// ============================================================================
// 幽灵层索引盒
// ============================================================================

/// 带幽灵层的跨步索引盒
///
/// `origin` 与 `size` 描述子网格拥有的单元，存储范围向每个方向外扩 `ghost` 层。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostBox {
    origin: [i32; 3],
    size: [i32; 3],
    ghost: i32,
    dims: [usize; 3],
}

impl GhostBox {
    /// 创建索引盒
    pub fn new(origin: [i32; 3], size: [i32; 3], ghost: i32) -> RhResult<Self> {
        if size.iter().any(|&n| n <= 0) {
            return Err(RhError::invalid_grid(format!(
                "索引盒尺寸必须为正: {:?}",
                size
            )));
        }
        if ghost < 0 {
            return Err(RhError::invalid_grid(format!("幽灵层宽度不能为负: {}", ghost)));
        }
        let dims = [
            (size[0] + 2 * ghost) as usize,
            (size[1] + 2 * ghost) as usize,
            (size[2] + 2 * ghost) as usize,
        ];
        Ok(Self {
            origin,
            size,
            ghost,
            dims,
        })
    }

    /// 拥有单元的全局起点
    #[inline]
    pub fn origin(&self) -> [i32; 3] {
        self.origin
    }

    /// 拥有单元的尺寸
    #[inline]
    pub fn size(&self) -> [i32; 3] {
        self.size
    }

    /// 幽灵层宽度
    #[inline]
    pub fn ghost(&self) -> i32 {
        self.ghost
    }

    /// 含幽灵层的存储尺寸
    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// 存储长度
    #[inline]
    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// 是否为空（构造保证非空）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// x 方向跨度
    #[inline]
    pub fn stride_x(&self) -> usize {
        1
    }

    /// y 方向跨度
    #[inline]
    pub fn stride_y(&self) -> usize {
        self.dims[0]
    }

    /// z 方向跨度
    #[inline]
    pub fn stride_z(&self) -> usize {
        self.dims[0] * self.dims[1]
    }

    /// 拥有单元范围
    pub fn owned(&self) -> CellRange {
        CellRange::new(
            self.origin,
            [
                self.origin[0] + self.size[0],
                self.origin[1] + self.size[1],
                self.origin[2] + self.size[2],
            ],
        )
    }

    /// 含幽灵层的存储范围
    pub fn storage(&self) -> CellRange {
        let g = self.ghost;
        CellRange::new(
            [self.origin[0] - g, self.origin[1] - g, self.origin[2] - g],
            [
                self.origin[0] + self.size[0] + g,
                self.origin[1] + self.size[1] + g,
                self.origin[2] + self.size[2] + g,
            ],
        )
    }

    /// 拥有范围在低侧各外扩一层（面循环使用的范围）
    pub fn low_extended(&self) -> CellRange {
        let g = self.ghost.min(1);
        let own = self.owned();
        CellRange::new(
            [own.lo[0] - g, own.lo[1] - g, own.lo[2] - g],
            own.hi,
        )
    }

    /// 坐标是否落在存储范围内
    #[inline]
    pub fn contains(&self, i: i32, j: i32, k: i32) -> bool {
        self.storage().contains(i, j, k)
    }

    /// 坐标是否为拥有单元
    #[inline]
    pub fn owns(&self, i: i32, j: i32, k: i32) -> bool {
        self.owned().contains(i, j, k)
    }

    /// 全局坐标转线性下标
    ///
    /// 调试构建下越界即 panic；发布构建不检查，调用方负责保证坐标合法。
    #[inline]
    pub fn index(&self, i: i32, j: i32, k: i32) -> usize {
        debug_assert!(
            self.contains(i, j, k),
            "坐标 ({}, {}, {}) 超出索引盒 {:?}",
            i,
            j,
            k,
            self.storage()
        );
        let g = self.ghost;
        let li = (i - self.origin[0] + g) as usize;
        let lj = (j - self.origin[1] + g) as usize;
        let lk = (k - self.origin[2] + g) as usize;
        li + self.dims[0] * (lj + self.dims[1] * lk)
    }

    /// 带检查的下标换算
    #[inline]
    pub fn try_index(&self, i: i32, j: i32, k: i32) -> Option<usize> {
        if self.contains(i, j, k) {
            Some(self.index(i, j, k))
        } else {
            None
        }
    }

    /// 带检查的下标换算，越界返回错误
    pub fn checked_index(&self, i: i32, j: i32, k: i32) -> RhResult<usize> {
        self.try_index(i, j, k).ok_or(RhError::OutOfBox { i, j, k })
    }

    /// 线性下标转全局坐标
    pub fn coords(&self, idx: usize) -> (i32, i32, i32) {
        debug_assert!(idx < self.len());
        let li = idx % self.dims[0];
        let lj = (idx / self.dims[0]) % self.dims[1];
        let lk = idx / (self.dims[0] * self.dims[1]);
        let g = self.ghost;
        (
            li as i32 + self.origin[0] - g,
            lj as i32 + self.origin[1] - g,
            lk as i32 + self.origin[2] - g,
        )
    }

    /// 偏移量 `(di, dj, dk)` 对应的线性下标差
    #[inline]
    pub fn offset(&self, di: i32, dj: i32, dk: i32) -> isize {
        di as isize + self.stride_y() as isize * dj as isize + self.stride_z() as isize * dk as isize
    }
}
