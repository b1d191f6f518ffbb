//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 习惯奖励引擎命令行工具
///
/// 所有结果以 JSON 写到 stdout，日志写到 stderr。
#[derive(Parser, Debug)]
#[command(name = "reward-engine")]
#[command(version, about = "习惯打卡奖励与徽章引擎")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// 安装指标 recorder，并在结束时把指标输出到 stderr
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 处理一次打卡
    ///
    /// 读取 JSON 格式的打卡请求，输出打卡结果。
    Complete {
        /// 请求文件路径，"-" 表示从 stdin 读取
        #[arg(short, long, default_value = "-")]
        request: PathBuf,

        /// 覆盖请求中的日期 (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// 重新评估徽章（非打卡触发）
    ///
    /// 读取 JSON 格式的用户进度和徽章目录，只评估经验和等级条件。
    Recheck {
        /// 请求文件路径，"-" 表示从 stdin 读取
        #[arg(short, long, default_value = "-")]
        request: PathBuf,
    },

    /// 推断习惯难度
    Classify {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// 预计耗时（分钟）
        #[arg(short, long)]
        minutes: Option<u32>,
    },

    /// 输出当前生效的奖励配置
    Config,
}
