// crates/rh_physics/src/numerics/csr.rs

//! 压缩稀疏行（CSR）矩阵格式
//!
//! 组装得到的模板矩阵对 `(J, JC)` 可以导出为 CSR，交给外部线性求解器或用于校验。
//!
//! # 格式说明
//!
//! CSR 使用三个数组存储：
//! - `row_ptr`: 行指针，长度 n_rows + 1，row_ptr[i] 是第 i 行第一个非零元的索引
//! - `col_idx`: 列索引，与非零元一一对应，行内有序
//! - `values`: 非零元值
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::numerics::csr::CsrBuilder;
//!
//! let mut builder = CsrBuilder::new_square(3);
//! builder.add(0, 0, 4.0);
//! builder.add(0, 1, -1.0);
//! builder.add(1, 1, 4.0);
//! builder.add(2, 2, 4.0);
//! builder.add(2, 2, 1.0);
//! let matrix = builder.build();
//!
//! let x = vec![1.0, 2.0, 3.0];
//! let mut y = vec![0.0; 3];
//! matrix.mul_vec(&x, &mut y);
//! assert_eq!(y, vec![2.0, 8.0, 15.0]);
//! ```

use std::collections::BTreeMap;

// =============================================================================
// CSR 矩阵主体
// =============================================================================

/// CSR 格式稀疏矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// 获取行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 获取列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 获取非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 获取行指针
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// 获取列索引
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// 获取值切片
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 获取 (row, col) 位置的值（不存在返回 0）
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        match self.col_idx[start..end].binary_search(&col) {
            Ok(local) => self.values[start + local],
            Err(_) => 0.0,
        }
    }

    /// 获取第 row 行的非零元视图
    #[inline]
    pub fn row(&self, row: usize) -> RowView<'_> {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        RowView {
            col_idx: &self.col_idx[start..end],
            values: &self.values[start..end],
        }
    }

    /// 矩阵-向量乘法 y = A * x
    ///
    /// # Panics
    /// - `x.len() != self.n_cols()`
    /// - `y.len() != self.n_rows()`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols, "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows, "y 长度必须等于矩阵行数");

        for (row, out) in y.iter_mut().enumerate() {
            *out = self.row(row).iter().map(|(col, v)| v * x[col]).sum();
        }
    }

    /// 检查矩阵是否在容差内对称
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.n_rows).all(|i| {
            self.row(i)
                .iter()
                .filter(|&(j, _)| j > i)
                .all(|(j, a_ij)| (a_ij - self.get(j, i)).abs() <= tol)
        })
    }

    /// 计算矩阵的无穷范数（最大行和）
    pub fn infinity_norm(&self) -> f64 {
        (0..self.n_rows)
            .map(|row| self.row(row).values().iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// 计算 Frobenius 范数
    pub fn frobenius_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

// =============================================================================
// 行视图辅助类型
// =============================================================================

/// 行视图：提供对矩阵某一行的非零元的只读访问
pub struct RowView<'a> {
    col_idx: &'a [usize],
    values: &'a [f64],
}

impl<'a> RowView<'a> {
    /// 获取列索引切片
    #[inline]
    pub fn col_indices(&self) -> &'a [usize] {
        self.col_idx
    }

    /// 获取值切片
    #[inline]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// 获取非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 行和
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// 迭代 (列索引, 值) 对
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.col_idx.iter().copied().zip(self.values.iter().copied())
    }
}

// =============================================================================
// 构建器
// =============================================================================

/// CSR 矩阵构建器
///
/// 使用 BTreeMap 临时存储，重复位置累加，构建时转换为紧凑 CSR 格式。
/// 显式为零的系数不会写入。
pub struct CsrBuilder {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    /// 创建方阵构建器
    #[inline]
    pub fn new_square(n: usize) -> Self {
        Self::new(n, n)
    }

    /// 创建构建器
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// 累加到 (row, col)
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows && col < self.n_cols, "({}, {}) 越界", row, col);
        if value != 0.0 {
            *self.rows[row].entry(col).or_insert(0.0) += value;
        }
    }

    /// 构建 CSR 矩阵
    pub fn build(self) -> CsrMatrix {
        let nnz: usize = self.rows.iter().map(BTreeMap::len).sum();
        let mut row_ptr = Vec::with_capacity(self.n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for row in self.rows {
            for (col, v) in row {
                col_idx.push(col);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laplacian_1d(n: usize) -> CsrMatrix {
        let mut b = CsrBuilder::new_square(n);
        for i in 0..n {
            b.add(i, i, 2.0);
            if i > 0 {
                b.add(i, i - 1, -1.0);
            }
            if i + 1 < n {
                b.add(i, i + 1, -1.0);
            }
        }
        b.build()
    }

    #[test]
    fn test_builder_accumulates() {
        let mut b = CsrBuilder::new_square(2);
        b.add(0, 1, 1.5);
        b.add(0, 1, 2.0);
        b.add(1, 0, 0.0);
        let m = b.build();
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.get(0, 1), 3.5);
        assert_eq!(m.get(1, 0), 0.0);
    }

    #[test]
    fn test_mul_vec_and_norms() {
        let m = laplacian_1d(4);
        let x = vec![1.0; 4];
        let mut y = vec![0.0; 4];
        m.mul_vec(&x, &mut y);
        assert_eq!(y, vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(m.infinity_norm(), 4.0);
        assert!((m.frobenius_norm() - (4.0f64 * 4.0 + 6.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_symmetry_check() {
        assert!(laplacian_1d(5).is_symmetric(1e-14));
        let mut b = CsrBuilder::new_square(2);
        b.add(0, 1, 1.0);
        b.add(1, 0, 2.0);
        assert!(!b.build().is_symmetric(1e-14));
    }

    #[test]
    fn test_row_view() {
        let m = laplacian_1d(3);
        let row = m.row(1);
        assert_eq!(row.col_indices(), &[0, 1, 2]);
        assert_eq!(row.nnz(), 3);
        assert_eq!(row.sum(), 0.0);
    }
}
