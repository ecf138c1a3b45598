// crates/rh_config/src/lib.rs

//! Richards Jacobian Config Layer
//!
//! 配置层，提供雅可比组装的数值方案选项与物理参数。
//! 本层完全无泛型，所有数值使用 f64。
//!
//! # 模块概览
//!
//! - [`options`]: 坡度迎风公式、坡面流模型等枚举选项
//! - [`jacobian_config`]: JacobianConfig 组装配置（JSON 与键值输入）
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! rh_cli        ─> uses JacobianConfig
//! rh_physics    ─> RichardsJacobian::new(config, ...)
//! rh_config     ─> JacobianConfig (本层)
//! rh_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod jacobian_config;
pub mod options;

// 重导出核心类型
pub use error::ConfigError;
pub use jacobian_config::{JacobianConfig, OverlandConfig, PhysicsConfig, TerrainFollowingConfig};
pub use options::{OptionParseError, OverlandModel, SlopeUpwindFormulation};
