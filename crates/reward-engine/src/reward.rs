//! 奖励计算器
//!
//! xp = round(基础经验 × 新手经验倍率 × 连续天数倍率)
//! coins = round(基础金币 × 新手金币倍率)
//! 舍入为四舍五入（远离零方向）。

use crate::config::{BaseReward, FtueTier, RewardConfig, StreakTier};
use crate::error::{EngineError, Result};
use crate::models::Difficulty;
use serde::Serialize;
use std::collections::BTreeMap;

/// 单次打卡的奖励
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reward {
    pub xp: u64,
    pub coins: u64,
    pub xp_multiplier: f64,
    pub coin_multiplier: f64,
    pub streak_multiplier: f64,
}

/// 奖励计算器
#[derive(Debug, Clone)]
pub struct RewardCalculator {
    base_rewards: BTreeMap<Difficulty, BaseReward>,
    ftue_tiers: Vec<FtueTier>,
    /// 按 min_streak 降序，便于取第一个满足的档位
    streak_tiers: Vec<StreakTier>,
}

impl RewardCalculator {
    pub fn new(config: &RewardConfig) -> Self {
        let mut streak_tiers = config.streak_tiers.clone();
        streak_tiers.sort_by(|a, b| b.min_streak.cmp(&a.min_streak));

        Self {
            base_rewards: config.base_rewards.clone(),
            ftue_tiers: config.ftue_tiers.clone(),
            streak_tiers,
        }
    }

    /// 获取基础奖励，缺失说明配置有缺陷
    pub fn base_reward(&self, difficulty: Difficulty) -> Result<BaseReward> {
        self.base_rewards
            .get(&difficulty)
            .copied()
            .ok_or(EngineError::MissingBaseReward { difficulty })
    }

    /// 新手加成倍率 (经验, 金币)，只取第一个匹配档位
    pub fn ftue_multipliers(&self, total_completed: u64) -> (f64, f64) {
        self.ftue_tiers
            .iter()
            .find(|tier| tier.max_completions > total_completed)
            .map(|tier| (tier.xp_multiplier, tier.coin_multiplier))
            .unwrap_or((1.0, 1.0))
    }

    /// 连续天数倍率
    pub fn streak_multiplier(&self, streak: u32) -> f64 {
        self.streak_tiers
            .iter()
            .find(|tier| streak >= tier.min_streak)
            .map(|tier| tier.multiplier)
            .unwrap_or(1.0)
    }

    /// 计算奖励
    ///
    /// # Arguments
    /// * `total_completed` - 本次打卡之前用户的累计打卡次数
    /// * `new_streak` - 本次打卡之后的连续天数
    pub fn calculate(
        &self,
        difficulty: Difficulty,
        total_completed: u64,
        new_streak: u32,
    ) -> Result<Reward> {
        let base = self.base_reward(difficulty)?;
        let (xp_multiplier, coin_multiplier) = self.ftue_multipliers(total_completed);
        let streak_multiplier = self.streak_multiplier(new_streak);

        Ok(Reward {
            xp: round_reward(base.xp as f64 * xp_multiplier * streak_multiplier),
            coins: round_reward(base.coins as f64 * coin_multiplier),
            xp_multiplier,
            coin_multiplier,
            streak_multiplier,
        })
    }
}

/// f64::round 即为远离零方向的四舍五入
fn round_reward(value: f64) -> u64 {
    value.round().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> RewardCalculator {
        RewardCalculator::new(&RewardConfig::default())
    }

    #[test]
    fn test_first_completion_quadruple_boost() {
        let calc = calculator();
        for (difficulty, xp, coins) in [
            (Difficulty::Easy, 10, 1),
            (Difficulty::Medium, 20, 2),
            (Difficulty::Hard, 30, 3),
        ] {
            let reward = calc.calculate(difficulty, 0, 1).unwrap();
            assert_eq!(reward.xp, xp * 4, "{}", difficulty);
            assert_eq!(reward.coins, coins * 4, "{}", difficulty);
        }
    }

    #[test]
    fn test_second_and_third_completion_double_boost() {
        let calc = calculator();
        let reward = calc.calculate(Difficulty::Medium, 1, 2).unwrap();
        assert_eq!(reward.xp, 40);
        assert_eq!(reward.coins, 4);

        let reward = calc.calculate(Difficulty::Medium, 2, 1).unwrap();
        assert_eq!(reward.xp, 40);
        assert_eq!(reward.coins, 4);
    }

    #[test]
    fn test_boost_ends_after_three_completions() {
        let calc = calculator();
        assert_eq!(calc.ftue_multipliers(3), (1.0, 1.0));
        let reward = calc.calculate(Difficulty::Easy, 3, 1).unwrap();
        assert_eq!(reward.xp, 10);
        assert_eq!(reward.coins, 1);
    }

    #[test]
    fn test_hard_seven_day_streak() {
        let reward = calculator().calculate(Difficulty::Hard, 5, 7).unwrap();
        assert_eq!(reward.xp, 45);
        assert_eq!(reward.coins, 3);
        assert_eq!(reward.streak_multiplier, 1.5);
    }

    #[test]
    fn test_streak_multiplier_breakpoints() {
        let calc = calculator();
        assert_eq!(calc.streak_multiplier(0), 1.0);
        assert_eq!(calc.streak_multiplier(2), 1.0);
        assert_eq!(calc.streak_multiplier(3), 1.2);
        assert_eq!(calc.streak_multiplier(6), 1.2);
        assert_eq!(calc.streak_multiplier(7), 1.5);
        assert_eq!(calc.streak_multiplier(365), 1.5);
    }

    #[test]
    fn test_streak_multiplier_monotonic() {
        let calc = calculator();
        let mut previous = calc.streak_multiplier(0);
        for streak in 1..=60 {
            let current = calc.streak_multiplier(streak);
            assert!(current >= previous, "streak {} decreased", streak);
            previous = current;
        }
    }

    #[test]
    fn test_streak_multiplier_never_touches_coins() {
        let reward = calculator().calculate(Difficulty::Easy, 10, 3).unwrap();
        assert_eq!(reward.xp, 12);
        assert_eq!(reward.coins, 1);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let config = RewardConfig {
            ftue_tiers: vec![FtueTier {
                max_completions: 1,
                xp_multiplier: 1.25,
                coin_multiplier: 2.5,
            }],
            ..Default::default()
        };
        let calc = RewardCalculator::new(&config);
        // 10 * 1.25 = 12.5 -> 13, 1 * 2.5 = 2.5 -> 3
        let reward = calc.calculate(Difficulty::Easy, 0, 1).unwrap();
        assert_eq!(reward.xp, 13);
        assert_eq!(reward.coins, 3);
    }

    #[test]
    fn test_missing_base_reward_fails_loudly() {
        let mut config = RewardConfig::default();
        config.base_rewards.remove(&Difficulty::Easy);
        let calc = RewardCalculator::new(&config);

        let err = calc.calculate(Difficulty::Easy, 0, 1).unwrap_err();
        assert!(matches!(err, EngineError::MissingBaseReward { .. }));
    }
}
