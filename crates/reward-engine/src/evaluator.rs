//! 徽章条件评估器
//!
//! 按目录顺序依次评估，已解锁徽章的经验奖励会立即累加到运行中的上下文，
//! 因此同一轮中先解锁的徽章可以帮助后面的里程碑徽章达标。

use crate::compiler::ParsedCondition;
use crate::models::{BadgeDefinition, Trigger};
use crate::store::BadgeCatalog;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// 评估上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeContext {
    /// 历史累计经验
    pub cumulative_xp: u64,
    pub level: u32,
    pub streak: u32,
    pub category: Option<String>,
    pub trigger: Trigger,
}

/// 一轮评估的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BadgeEvaluation {
    /// 按解锁顺序排列的新徽章
    pub unlocked: Vec<BadgeDefinition>,
    pub xp_reward: u64,
    pub coin_reward: u64,
    /// 评估结束后的持有徽章集合
    pub owned_badge_ids: BTreeSet<String>,
    /// 评估结束时的累计经验（含本轮徽章经验）
    pub final_cumulative_xp: u64,
}

pub struct BadgeEvaluator;

impl BadgeEvaluator {
    /// 判断单个条件是否满足
    pub fn matches(condition: &ParsedCondition, context: &BadgeContext) -> bool {
        let on_completion = context.trigger == Trigger::CompleteHabit;

        match condition {
            ParsedCondition::StreakThreshold(n) => on_completion && context.streak >= *n,
            ParsedCondition::CategoryMatch(label) => {
                on_completion
                    && context
                        .category
                        .as_deref()
                        .is_some_and(|c| c.trim().to_lowercase() == *label)
            }
            ParsedCondition::LevelThreshold(n) => context.level >= *n,
            ParsedCondition::XpThreshold(n) => context.cumulative_xp >= *n,
            ParsedCondition::Unrecognized => false,
        }
    }

    /// 评估整个目录，返回新解锁的徽章
    ///
    /// 已持有的徽章和可购买徽章一律跳过。
    pub fn evaluate(
        catalog: &BadgeCatalog,
        owned_badge_ids: &BTreeSet<String>,
        context: &BadgeContext,
    ) -> BadgeEvaluation {
        let mut running = context.clone();
        let mut owned = owned_badge_ids.clone();
        let mut evaluation = BadgeEvaluation::default();

        for compiled in catalog.iter() {
            if owned.contains(compiled.id()) || compiled.badge.is_purchasable() {
                continue;
            }

            if !Self::matches(&compiled.condition, &running) {
                continue;
            }

            let badge = &compiled.badge;
            running.cumulative_xp = running.cumulative_xp.saturating_add(badge.xp_reward);
            evaluation.xp_reward = evaluation.xp_reward.saturating_add(badge.xp_reward);
            evaluation.coin_reward = evaluation.coin_reward.saturating_add(badge.coin_reward);
            owned.insert(badge.id.clone());
            evaluation.unlocked.push(badge.clone());

            debug!(
                badge_id = %badge.id,
                condition = ?compiled.condition,
                cumulative_xp = running.cumulative_xp,
                "徽章条件满足"
            );
        }

        evaluation.owned_badge_ids = owned;
        evaluation.final_cumulative_xp = running.cumulative_xp;
        evaluation
    }
}
