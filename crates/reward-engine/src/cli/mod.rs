//! CLI 模块
//!
//! - `complete` - 处理一次打卡请求
//! - `recheck` - 非打卡触发的徽章重新评估
//! - `classify` - 推断习惯难度
//! - `config` - 输出生效的奖励配置
//!
//! # 使用示例
//!
//! ```bash
//! reward-engine complete --request request.json --today 2024-03-10
//! cat progress.json | reward-engine recheck
//! reward-engine classify --title "Morning run" --minutes 45
//! HABIT_REWARD__LEVEL_XP_BASE=200 reward-engine config
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{CommandRunner, read_input};
