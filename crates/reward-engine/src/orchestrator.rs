//! 打卡编排器
//!
//! 对单次打卡事件依次执行：连续天数 → 奖励计算 → 等级结算 → 徽章评估。
//! 编排器是纯函数：不做 I/O，不持有可变共享状态，新状态由调用方持久化。

use crate::config::RewardConfig;
use crate::error::Result;
use crate::evaluator::{BadgeContext, BadgeEvaluator};
use crate::leveling::LevelingLadder;
use crate::models::{
    CompletionRequest, CompletionResult, RecheckResult, Trigger, UserProgress,
};
use crate::reward::RewardCalculator;
use crate::store::BadgeCatalog;
use crate::streak::StreakTracker;
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument};

/// 单次打卡的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStage {
    Received,
    StreakEvaluated,
    RewardsComputed,
    LevelApplied,
    BadgesEvaluated,
    Committed,
}

impl CompletionStage {
    /// 下一阶段，`Committed` 为终态
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::StreakEvaluated),
            Self::StreakEvaluated => Some(Self::RewardsComputed),
            Self::RewardsComputed => Some(Self::LevelApplied),
            Self::LevelApplied => Some(Self::BadgesEvaluated),
            Self::BadgesEvaluated => Some(Self::Committed),
            Self::Committed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Committed
    }
}

impl fmt::Display for CompletionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::StreakEvaluated => "streak_evaluated",
            Self::RewardsComputed => "rewards_computed",
            Self::LevelApplied => "level_applied",
            Self::BadgesEvaluated => "badges_evaluated",
            Self::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// 奖励引擎
///
/// 构造时校验配置，之后可在多线程间共享（只读）。
#[derive(Debug, Clone)]
pub struct RewardEngine {
    config: RewardConfig,
    rewards: RewardCalculator,
    ladder: LevelingLadder,
}

impl RewardEngine {
    pub fn new(config: RewardConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            rewards: RewardCalculator::new(&config),
            ladder: LevelingLadder::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn rewards(&self) -> &RewardCalculator {
        &self.rewards
    }

    pub fn ladder(&self) -> &LevelingLadder {
        &self.ladder
    }

    /// 处理一次打卡，使用请求中携带的徽章目录
    pub fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult> {
        let catalog = BadgeCatalog::compile(request.badge_catalog.iter().cloned());
        self.complete_with_catalog(request, &catalog)
    }

    /// 处理一次打卡，使用预编译的徽章目录
    ///
    /// 请求中的 `badge_catalog` 会被忽略。
    #[instrument(
        skip_all,
        fields(difficulty = %request.difficulty, today = %request.today)
    )]
    pub fn complete_with_catalog(
        &self,
        request: &CompletionRequest,
        catalog: &BadgeCatalog,
    ) -> Result<CompletionResult> {
        let mut stage = CompletionStage::Received;

        let transition = StreakTracker::evaluate(
            request.last_completed_date,
            request.today,
            request.current_streak,
        );
        let Some(new_streak) = transition.new_streak() else {
            debug!(from = %stage, "今日已打卡，直接提交无变化结果");
            return Ok(CompletionResult::unchanged(request));
        };
        stage = advance(stage);
        debug!(stage = %stage, ?transition, "连续天数已计算");

        let reward =
            self.rewards
                .calculate(request.difficulty, request.total_completed_by_user, new_streak)?;
        stage = advance(stage);
        debug!(stage = %stage, xp = reward.xp, coins = reward.coins, "打卡奖励已计算");

        let level = self
            .ladder
            .apply(request.user_xp_remainder, request.user_level, reward.xp);
        stage = advance(stage);
        debug!(
            stage = %stage,
            new_level = level.new_level,
            levels_gained = level.levels_gained,
            "等级已结算"
        );

        let total_xp_after_reward = request.user_total_xp_earned.saturating_add(reward.xp);
        let context = BadgeContext {
            cumulative_xp: total_xp_after_reward,
            level: level.new_level,
            streak: new_streak,
            category: request.category.clone(),
            trigger: Trigger::CompleteHabit,
        };
        let badges = BadgeEvaluator::evaluate(catalog, &request.owned_badge_ids, &context);

        // 徽章经验计入等级，可能触发第二次升级
        let final_level =
            self.ladder
                .apply(level.new_xp_remainder, level.new_level, badges.xp_reward);
        stage = advance(stage);
        debug!(
            stage = %stage,
            unlocked = badges.unlocked.len(),
            badge_xp = badges.xp_reward,
            badge_coins = badges.coin_reward,
            "徽章已评估"
        );

        let bonus_coins = level.bonus_coins.saturating_add(final_level.bonus_coins);
        let coins_delta = reward
            .coins
            .saturating_add(bonus_coins)
            .saturating_add(badges.coin_reward);

        let result = CompletionResult {
            already_completed_today: false,
            new_streak,
            xp_earned: reward.xp,
            coins_earned: reward.coins,
            leveled_up: level.leveled_up || final_level.leveled_up,
            new_level: final_level.new_level,
            new_xp_remainder: final_level.new_xp_remainder,
            new_coins: request.user_coins.saturating_add(coins_delta),
            new_total_xp_earned: total_xp_after_reward.saturating_add(badges.xp_reward),
            new_total_coins_earned: request.user_total_coins_earned.saturating_add(coins_delta),
            unlocked_badges: badges.unlocked,
            new_completed_count: request.habit_completed_count.saturating_add(1),
            new_total_completed: request.total_completed_by_user.saturating_add(1),
            new_last_completed_date: Some(request.today),
            bonus_coins,
            badge_xp: badges.xp_reward,
            badge_coins: badges.coin_reward,
            new_owned_badge_ids: badges.owned_badge_ids,
        };

        stage = advance(stage);
        debug!(stage = %stage, new_streak, leveled_up = result.leveled_up, "打卡处理完成");

        Ok(result)
    }

    /// 非打卡触发的徽章重新评估
    ///
    /// 连续天数和分类条件不会在此触发下满足，只检查经验与等级阈值。
    #[instrument(skip_all, fields(level = progress.level))]
    pub fn recheck_badges(&self, progress: &UserProgress, catalog: &BadgeCatalog) -> RecheckResult {
        let context = BadgeContext {
            cumulative_xp: progress.total_xp_earned,
            level: progress.level.max(1),
            streak: 0,
            category: None,
            trigger: Trigger::Recheck,
        };
        let badges = BadgeEvaluator::evaluate(catalog, &progress.owned_badge_ids, &context);
        let level = self
            .ladder
            .apply(progress.xp_remainder, progress.level, badges.xp_reward);

        let coins_delta = badges.coin_reward.saturating_add(level.bonus_coins);
        debug!(
            unlocked = badges.unlocked.len(),
            leveled_up = level.leveled_up,
            "徽章重新评估完成"
        );

        RecheckResult {
            progress: UserProgress {
                xp_remainder: level.new_xp_remainder,
                total_xp_earned: progress.total_xp_earned.saturating_add(badges.xp_reward),
                coins: progress.coins.saturating_add(coins_delta),
                total_coins_earned: progress.total_coins_earned.saturating_add(coins_delta),
                level: level.new_level,
                total_completed: progress.total_completed,
                owned_badge_ids: badges.owned_badge_ids,
            },
            unlocked_badges: badges.unlocked,
            leveled_up: level.leveled_up,
        }
    }
}

fn advance(stage: CompletionStage) -> CompletionStage {
    stage.next().unwrap_or(stage)
}
