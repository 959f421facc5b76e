//! # DataLayer Relay CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 以 NDJSON 输入驱动 relay
//! - 运行统计输出

mod cli;
mod commands;
mod input;
mod summary;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_relay, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(log_config(&cli))?;

    info!(
        version = relay::RELAY_VERSION,
        "DataLayer relay CLI starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_relay(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Logging setup from CLI options
///
/// Without `-v`/`-q` the `run` command follows the config's `debug` switch.
fn log_config(cli: &Cli) -> ObservabilityConfig {
    let default_log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 1) => "debug",
        (false, 2..) => "trace",
        (false, 0) => return config_log_config(cli),
    };

    ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    }
}

fn config_log_config(cli: &Cli) -> ObservabilityConfig {
    let base = match &cli.command {
        Commands::Run(args) => config_loader::ConfigLoader::load_from_path(&args.config)
            .map(|config| ObservabilityConfig::for_debug(config.debug))
            .unwrap_or_default(),
        _ => ObservabilityConfig::default(),
    };

    ObservabilityConfig {
        log_format: cli.log_format.into(),
        ..base
    }
}
