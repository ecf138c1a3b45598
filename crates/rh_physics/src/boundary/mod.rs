// crates/rh_physics/src/boundary/mod.rs

//! 边界条件模块
//!
//! 本模块提供雅可比组装中的边界处理：
//!
//! # 子模块
//!
//! - [`types`]: 边界类型与边界条件
//! - [`value`]: 给定值来源（常数、时间序列、静水压力）
//! - [`patch`]: 边界片及其在各子网格上的面
//! - [`dispatch`]: 按类型修正雅可比行的处理器
//! - [`internal`]: 域内固定压力点
//!
//! # 主要类型
//!
//! - [`BoundaryKind`]: Flux / Dirichlet / Seepage / Overland / OverlandKinematic / OverlandDiffusive
//! - [`BoundaryPatchSet`]: 计算域全部边界片
//! - [`BoundaryRowHandler`]: 行修正接口，[`handler_for`] 取得各类型的实现
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::boundary::{BcValue, BoundaryCondition, BoundaryKind, BoundaryPatchSet, PatchSide};
//! use rh_physics::grid::{DomainGeometry, Grid};
//!
//! let grid = Grid::uniform([4, 4, 3], [1.0, 1.0, 0.5]).unwrap();
//! let geometry = DomainGeometry::full(&grid);
//! let patches = BoundaryPatchSet::builder()
//!     .side("land_surface", PatchSide::Top, BoundaryCondition::overland_kinematic(BcValue::Constant(0.0)))
//!     .side("bottom", PatchSide::Bottom, BoundaryCondition::dirichlet(BcValue::Constant(-2.0)))
//!     .build(&grid, &geometry)
//!     .unwrap();
//! assert!(patches.has_kind(BoundaryKind::OverlandKinematic));
//! assert_eq!(patches.get("land_surface").unwrap().num_faces(), 16);
//! ```

pub mod dispatch;
pub mod internal;
pub mod patch;
pub mod types;
pub mod value;

// 从 types 模块导出
pub use types::{BoundaryCondition, BoundaryError, BoundaryKind};

// 从 value 模块导出
pub use value::{BcValue, ExtrapolationMode, TimeSeries};

// 从 patch 模块导出
pub use patch::{
    BoundaryFace, BoundaryPatch, BoundaryPatchSet, BoundaryPatchSetBuilder, FacePredicate,
    PatchFaces, PatchSelector, PatchSide, DEFAULT_PATCH_NAME,
};

// 从 dispatch 模块导出
pub use dispatch::{handler_for, BoundaryRowHandler, CouplingContext, RowContext};

// 从 internal 模块导出
pub use internal::{InternalBoundary, InternalDirichletPoints, NoInternalBoundary};
