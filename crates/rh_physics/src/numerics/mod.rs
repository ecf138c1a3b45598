// crates/rh_physics/src/numerics/mod.rs

//! 数值工具
//!
//! - [`means`]: 面上的平均（调和、迎风、算术）
//! - [`csr`]: 压缩稀疏行矩阵，用于导出与校验

pub mod csr;
pub mod means;

pub use csr::{CsrBuilder, CsrMatrix, RowView};
pub use means::{arithmetic_mean, harmonic_mean, harmonic_mean_dz, upstream_mean};
