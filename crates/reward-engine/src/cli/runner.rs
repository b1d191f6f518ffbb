//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑，结果以 JSON 返回给调用方输出。

use std::fs;
use std::io::Read as _;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use habit_shared::observability::metrics;

use crate::difficulty::classify_difficulty;
use crate::models::{CompletionRequest, CompletionResult, RecheckRequest};
use crate::orchestrator::RewardEngine;
use crate::store::BadgeCatalog;

/// 命令执行器
pub struct CommandRunner {
    engine: RewardEngine,
}

impl CommandRunner {
    pub fn new(engine: RewardEngine) -> Self {
        Self { engine }
    }

    /// 执行 complete 命令
    pub fn run_complete(&self, input: &str, today: Option<NaiveDate>) -> Result<String> {
        let mut request = CompletionRequest::from_json(input).context("打卡请求格式错误")?;
        if let Some(today) = today {
            request.today = today;
        }

        let start = Instant::now();
        let result = self.engine.complete(&request)?;
        record_completion_metrics(&request, &result, start.elapsed().as_secs_f64());

        info!(
            already_completed_today = result.already_completed_today,
            xp_earned = result.xp_earned,
            new_level = result.new_level,
            unlocked = result.unlocked_badges.len(),
            "打卡处理完成"
        );
        to_json(&result)
    }

    /// 执行 recheck 命令
    pub fn run_recheck(&self, input: &str) -> Result<String> {
        let request: RecheckRequest =
            serde_json::from_str(input).context("重新评估请求格式错误")?;
        let catalog = BadgeCatalog::compile(request.badge_catalog);

        let result = self.engine.recheck_badges(&request.progress, &catalog);
        for badge in &result.unlocked_badges {
            metrics::record_badge_unlock(badge.badge_type.as_str());
        }
        metrics::record_level_ups(u64::from(
            result.progress.level.saturating_sub(request.progress.level.max(1)),
        ));

        info!(unlocked = result.unlocked_badges.len(), "徽章重新评估完成");
        to_json(&result)
    }

    /// 执行 classify 命令
    pub fn run_classify(
        &self,
        title: &str,
        description: &str,
        minutes: Option<u32>,
    ) -> Result<String> {
        let difficulty = classify_difficulty(title, description, minutes);
        let base = self.engine.rewards().base_reward(difficulty)?;

        to_json(&ClassifyOutput {
            difficulty: difficulty.as_str(),
            base_xp: base.xp,
            base_coins: base.coins,
        })
    }

    /// 执行 config 命令
    pub fn run_config(&self) -> Result<String> {
        to_json(self.engine.config())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyOutput {
    difficulty: &'static str,
    base_xp: u64,
    base_coins: u64,
}

/// 读取输入，"-" 表示 stdin
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("读取 stdin 失败")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("读取文件失败: {}", path.display()))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("序列化输出失败")
}

fn record_completion_metrics(
    request: &CompletionRequest,
    result: &CompletionResult,
    duration_secs: f64,
) {
    if result.already_completed_today {
        metrics::record_completion("already_completed", 0, duration_secs);
        return;
    }

    metrics::record_completion("completed", result.xp_earned, duration_secs);
    for badge in &result.unlocked_badges {
        metrics::record_badge_unlock(badge.badge_type.as_str());
    }
    metrics::record_level_ups(u64::from(
        result.new_level.saturating_sub(request.user_level.max(1)),
    ));
}
