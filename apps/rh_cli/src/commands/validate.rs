// apps/rh_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查 JSON 配置文件与 `--set key=value` 覆盖项，给出错误与警告。

use anyhow::{bail, Result};
use clap::Args;
use rh_config::JacobianConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::split_override;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径（JSON）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 键值覆盖，如 `--set OverlandFlowDiffusive=1`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn is_ok_strict(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== 配置验证 ===");

    if args.config.is_none() && args.overrides.is_empty() {
        println!("用法: rh validate --config <配置文件> [--set KEY=VALUE ...]");
        println!("      rh validate --set KEY=VALUE [--set KEY=VALUE ...]");
        return Ok(());
    }

    let mut result = ValidationResult::default();
    if let Some(config) = validate(args.config.as_deref(), &args.overrides, &mut result) {
        check_semantics(&config, &mut result);
    }
    print_validation_result(&result, args.strict)
}

/// 加载并应用覆盖项，失败时记入错误
fn validate(path: Option<&Path>, overrides: &[String], result: &mut ValidationResult) -> Option<JacobianConfig> {
    let mut config = match path {
        Some(p) => {
            println!("\n检查配置文件: {}", p.display());
            if !p.exists() {
                result.add_error(format!("配置文件不存在: {}", p.display()));
                return None;
            }
            match JacobianConfig::from_file(p) {
                Ok(c) => {
                    println!("  ✓ 配置文件格式有效");
                    c
                }
                Err(e) => {
                    result.add_error(format!("{}: {e}", p.display()));
                    return None;
                }
            }
        }
        None => JacobianConfig::default(),
    };

    for item in overrides {
        match split_override(item) {
            Ok((key, value)) => {
                if let Err(e) = config.set_key(key, value) {
                    result.add_error(e.to_string());
                }
            }
            Err(e) => result.add_error(e.to_string()),
        }
    }

    match config.validate() {
        Ok(()) if result.is_ok() => Some(config),
        Ok(()) => None,
        Err(e) => {
            result.add_error(e.to_string());
            None
        }
    }
}

/// 合法但可疑的组合
fn check_semantics(config: &JacobianConfig, result: &mut ValidationResult) {
    let overland = &config.overland;
    if overland.spinup && overland.spinup_damp_p1 == 0.0 && overland.spinup_damp_p2 == 0.0 {
        result.add_warning("起转模式已开启，但阻尼参数 P1、P2 均为零");
    }
    if overland.spinup_damp_p1 < 0.0 || overland.spinup_damp_p2 < 0.0 {
        result.add_warning("阻尼参数为负，会放大而非抑制超渗项");
    }
    if overland.epsilon > 1.0e-2 {
        result.add_warning(format!("坡度下限 {} 较大，缓坡上的通量会被低估", overland.epsilon));
    }
    if config.physics.gravity == 0.0 {
        result.add_warning("重力为零，组装中不含重力驱动项");
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!();
    for e in &result.errors {
        error!("{e}");
        println!("  ✗ {e}");
    }
    for w in &result.warnings {
        warn!("{w}");
        println!("  ! {w}");
    }

    let ok = if strict { result.is_ok_strict() } else { result.is_ok() };
    if !ok {
        bail!(
            "验证失败: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        );
    }
    println!("验证通过 ({} 个警告)", result.warnings.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("jacobian.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_valid_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"{"use_jacobian": true, "overland": {"model": "diffusive"}}"#,
        );
        let mut result = ValidationResult::default();
        let config = validate(Some(&path), &[], &mut result).unwrap();
        check_semantics(&config, &mut result);
        assert!(result.is_ok_strict());
        assert!(config.use_jacobian);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = ValidationResult::default();
        assert!(validate(Some(&dir.path().join("absent.json")), &[], &mut result).is_none());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_malformed_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "{ use_jacobian: ");
        let mut result = ValidationResult::default();
        assert!(validate(Some(&path), &[], &mut result).is_none());
        assert!(!result.is_ok());
    }

    #[test]
    fn test_bad_override_is_error() {
        let mut result = ValidationResult::default();
        let overrides = vec!["Solver.OverlandKinematic.Epsilon=abc".to_string(), "Gravity".to_string()];
        assert!(validate(None, &overrides, &mut result).is_none());
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_spinup_without_damping_warns() {
        let mut result = ValidationResult::default();
        let overrides = vec!["OverlandFlowSpinUp=1".to_string()];
        let config = validate(None, &overrides, &mut result).unwrap();
        check_semantics(&config, &mut result);
        assert!(result.is_ok());
        assert!(!result.is_ok_strict());
        assert!(print_validation_result(&result, true).is_err());
    }
}
