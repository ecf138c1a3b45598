// crates/rh_config/src/error.rs

//! 配置层错误类型

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 未知配置键
    #[error("未知配置键: {0}")]
    UnknownKey(String),
}

impl ConfigError {
    /// 构造无效值错误
    pub fn invalid(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "physics.viscosity".to_string(),
            value: "-1".to_string(),
            reason: "必须为正".to_string(),
        };
        assert!(err.to_string().contains("physics.viscosity"));
    }

    #[test]
    fn test_invalid_helper() {
        let err = ConfigError::invalid("overland.epsilon", 0.0, "必须为正");
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "overland.epsilon");
                assert_eq!(value, "0");
            }
            other => panic!("意外的错误类型: {other}"),
        }
    }
}
