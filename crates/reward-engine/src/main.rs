//! 习惯奖励引擎 CLI
//!
//! 从配置文件与环境变量加载奖励配置，按子命令处理 JSON 输入。

use anyhow::{Context, Result};
use clap::Parser;
use habit_shared::config::{AppConfig, load_section};
use habit_shared::observability::{self, metrics};
use reward_engine::cli::{Cli, CommandRunner, Commands, read_input};
use reward_engine::{RewardConfig, RewardEngine};
use tracing::debug;

const SERVICE_NAME: &str = "reward-engine";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let mut obs_config = config.observability.clone().with_service_name(SERVICE_NAME);
    if let Some(level) = &cli.log_level {
        obs_config = obs_config.with_log_level(level);
    }
    if cli.metrics {
        obs_config.metrics_enabled = true;
    }
    let guard = observability::init(&obs_config)?;

    let reward_config: RewardConfig =
        load_section(SERVICE_NAME, "reward").context("加载奖励配置失败")?;
    debug!(environment = %config.environment, ?reward_config, "奖励配置已加载");

    let runner = CommandRunner::new(RewardEngine::new(reward_config)?);

    let output = match cli.command {
        Commands::Complete { request, today } => {
            runner.run_complete(&read_input(&request)?, today)?
        }
        Commands::Recheck { request } => runner.run_recheck(&read_input(&request)?)?,
        Commands::Classify {
            title,
            description,
            minutes,
        } => runner.run_classify(&title, &description, minutes)?,
        Commands::Config => runner.run_config()?,
    };

    println!("{}", output);

    if guard.metrics_enabled()
        && let Some(rendered) = metrics::render()
    {
        eprintln!("{}", rendered);
    }

    Ok(())
}
