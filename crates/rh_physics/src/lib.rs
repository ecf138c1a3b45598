// crates/rh_physics/src/lib.rs

//! 变饱和地下流雅可比组装
//!
//! 在结构化网格上组装 Richards 方程的 7 点雅可比 J；
//! 存在坡面漫流边界时，同时组装地表 5 点矩阵 JC，并提供两者合成的矩阵向量乘。
//!
//! # 模块概览
//!
//! - [`grid`]: 网格、子网格划分与活动区域几何
//! - [`fields`]: 带幽灵层的逐子网格场
//! - [`stencil`]: 模板矩阵存储（完整/对称）
//! - [`problem`]: 介质参数、地形与边界片
//! - [`constitutive`]: 密度、饱和度、相对渗透率
//! - [`boundary`]: 边界条件与边界行修正
//! - [`overland`]: 运动波与扩散波坡面通量
//! - [`halo`]: 幽灵层交换
//! - [`jacobian`]: 组装流程与矩阵向量乘
//! - [`numerics`]: 平均与 CSR 导出
//!
//! # 示例
//!
//! ```
//! use rh_config::JacobianConfig;
//! use rh_physics::{ConstitutiveLaws, DomainGeometry, Field, Grid, ProblemData, RichardsJacobian};
//!
//! let grid = Grid::uniform([4, 4, 3], [1.0, 1.0, 0.5])?;
//! let problem = ProblemData::builder(grid.clone(), DomainGeometry::full(&grid)).build()?;
//! let mut jacobian = RichardsJacobian::local(JacobianConfig::default(), problem, ConstitutiveLaws::default())?;
//!
//! let p = Field::filled(&grid, -1.0)?;
//! let pair = jacobian.evaluate(&p, &p, 0.1, 0.0, false)?;
//! assert!(pair.jc().is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod constitutive;
pub mod error;
pub mod fields;
pub mod grid;
pub mod halo;
pub mod jacobian;
pub mod numerics;
pub mod overland;
pub mod problem;
pub mod stencil;

// 重导出组装入口
pub use error::{AssemblyError, AssemblyResult};
pub use jacobian::{AssemblyParams, JacobianKind, JacobianPair, RichardsJacobian};

// 重导出网格与场
pub use fields::{Field, SubField};
pub use grid::{DomainGeometry, Grid, Subgrid};
pub use stencil::{StencilBlock, StencilMatrix, StencilShape, StencilSlot};

// 重导出问题描述
pub use constitutive::{
    CompressibleDensity, ConstantDensity, ConstantRelPerm, ConstantSaturation, ConstitutiveLaws,
    DensityLaw, ExponentialSaturation, GardnerRelPerm, LawValue, RelPermLaw, SaturationLaw,
};
pub use problem::{ProblemData, ProblemDataBuilder, Spatial};

// 重导出边界条件
pub use boundary::{
    BcValue, BoundaryCondition, BoundaryError, BoundaryKind, BoundaryPatchSet, InternalBoundary,
    InternalDirichletPoints, PatchSide, TimeSeries,
};

// 重导出坡面漫流与幽灵交换
pub use halo::{HaloError, HaloExchange, LocalHaloExchange};
pub use overland::{EvalMode, FaceConductance};
