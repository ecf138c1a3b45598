// crates/rh_physics/src/error.rs

//! 组装层错误类型
//!
//! 把下层错误（配置、布局、边界、幽灵交换）统一为 [`AssemblyError`]。
//! 幽灵交换失败不重试，调用方应中止本次非线性迭代。

use rh_config::ConfigError;
use rh_foundation::RhError;
use thiserror::Error;

use crate::boundary::BoundaryError;
use crate::halo::HaloError;

/// 组装结果类型
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// 雅可比组装错误
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// 配置错误（构造阶段）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 场或网格布局不一致
    #[error("布局错误: {0}")]
    Layout(#[from] RhError),

    /// 幽灵交换失败
    #[error("幽灵交换失败: {0}")]
    Halo(#[from] HaloError),

    /// 边界片或给定值错误
    #[error("边界错误: {0}")]
    Boundary(#[from] BoundaryError),

    /// 其他无效输入
    #[error("无效输入: {0}")]
    InvalidInput(String),
}

impl AssemblyError {
    /// 构造无效输入错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: AssemblyError = HaloError::PeerFailure("rank 3".into()).into();
        assert!(matches!(err, AssemblyError::Halo(_)));
        assert!(err.to_string().contains("rank 3"));

        let err: AssemblyError = RhError::invalid_input("bad").into();
        assert!(matches!(err, AssemblyError::Layout(_)));

        let err = AssemblyError::invalid_input("dt");
        assert!(err.to_string().contains("dt"));
    }
}
