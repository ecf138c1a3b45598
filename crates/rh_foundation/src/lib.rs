// crates/rh_foundation/src/lib.rs

//! Richards Jacobian Foundation Layer
//!
//! 基础层，提供整个工作区共享的底层抽象。
//!
//! # 模块概览
//!
//! - [`index`]: 带幽灵层的跨步索引盒与单元范围
//! - [`float`]: 数值常量和安全浮点工具
//! - [`error`]: 统一错误类型
//!
//! # 示例
//!
//! ```
//! use rh_foundation::{GhostBox, RhResult};
//!
//! fn cell_count() -> RhResult<usize> {
//!     let gbox = GhostBox::new([0, 0, 0], [8, 8, 4], 1)?;
//!     Ok(gbox.owned().len())
//! }
//! assert_eq!(cell_count().unwrap(), 256);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod float;
pub mod index;

// 重导出常用类型
pub use error::{RhError, RhResult};
pub use index::{CellRange, GhostBox};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{RhError, RhResult};
    pub use crate::float::{floor_magnitude, heaviside, positive_part, safe_div, safe_sqrt};
    pub use crate::index::{CellRange, GhostBox};
}
