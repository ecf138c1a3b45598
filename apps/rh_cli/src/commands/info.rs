// apps/rh_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示默认配置、可识别的键值配置键与枚举选项。

use anyhow::Result;
use clap::Args;
use rh_config::jacobian_config::KNOWN_KEYS;
use rh_config::{JacobianConfig, OverlandModel, SlopeUpwindFormulation};
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 显示默认配置（JSON）
    #[arg(long)]
    pub defaults: bool,

    /// 显示可识别的配置键
    #[arg(long)]
    pub keys: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("rh {}", env!("CARGO_PKG_VERSION"));

    let all = !args.defaults && !args.keys;
    if args.defaults || all {
        print_default_config()?;
    }
    if args.keys || all {
        if all {
            println!();
        }
        print_keys();
    }
    Ok(())
}

fn print_default_config() -> Result<()> {
    println!("=== 默认配置 ===");
    let config = JacobianConfig::default();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn print_keys() {
    println!("=== 配置键 ===");
    for key in KNOWN_KEYS {
        println!("  {key}");
    }

    println!("\n坡度迎风公式:");
    for f in SlopeUpwindFormulation::all() {
        println!("  - {f}");
    }

    println!("\n坡面流模型:");
    for m in [OverlandModel::Kinematic, OverlandModel::Diffusive] {
        println!("  - {m}");
    }
}
