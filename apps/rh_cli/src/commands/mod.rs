// apps/rh_cli/src/commands/mod.rs

//! 子命令实现

pub mod assemble;
pub mod info;
pub mod validate;

use anyhow::{Context, Result};
use rh_config::JacobianConfig;
use std::path::Path;

/// 拆分 `key=value` 覆盖项
pub fn split_override(item: &str) -> Result<(&str, &str)> {
    item.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .with_context(|| format!("覆盖项应为 key=value 形式: '{item}'"))
}

/// 读取配置文件（缺省为默认配置）并依次应用覆盖项
pub fn load_config(path: Option<&Path>, overrides: &[String]) -> Result<JacobianConfig> {
    let mut config = match path {
        Some(p) => JacobianConfig::from_file(p).with_context(|| format!("无法加载配置文件 {}", p.display()))?,
        None => JacobianConfig::default(),
    };
    for item in overrides {
        let (key, value) = split_override(item)?;
        config.set_key(key, value)?;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_config::OverlandModel;

    #[test]
    fn test_split_override() {
        assert_eq!(split_override("Gravity = 9.81").unwrap(), ("Gravity", "9.81"));
        assert!(split_override("Gravity").is_err());
    }

    #[test]
    fn test_overrides_apply_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut base = JacobianConfig::default();
        base.physics.gravity = 9.81;
        base.save_to_file(&path).unwrap();

        let overrides = vec![
            "OverlandFlowDiffusive=1".to_string(),
            "Solver.Nonlinear.UseJacobian=True".to_string(),
        ];
        let config = load_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.physics.gravity, 9.81);
        assert_eq!(config.overland.model, OverlandModel::Diffusive);
        assert!(config.use_jacobian);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = vec!["Phase.Viscosity=0".to_string()];
        assert!(load_config(None, &overrides).is_err());
        let unknown = vec!["Solver.Unknown=1".to_string()];
        assert!(load_config(None, &unknown).is_err());
    }
}
