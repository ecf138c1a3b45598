// apps/rh_cli/src/main.rs

//! Richards 雅可比组装命令行界面
//!
//! - `info`: 显示默认配置与可识别的键
//! - `validate`: 检查配置文件与键值覆盖
//! - `assemble`: 在示例山坡上组装一次 (J, JC) 并输出统计

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Richards 方程雅可比组装工具
#[derive(Parser)]
#[command(name = "rh")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Richards equation Jacobian assembly with overland flow", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 显示信息
    Info(commands::info::InfoArgs),
    /// 验证配置
    Validate(commands::validate::ValidateArgs),
    /// 组装示例问题
    Assemble(commands::assemble::AssembleArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // 同时接管库中 log 宏的输出
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Assemble(args) => commands::assemble::execute(args),
    }
}
