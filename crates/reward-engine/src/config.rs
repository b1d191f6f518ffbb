//! 奖励配置
//!
//! 基础奖励表、新手加成档位、连续天数倍率和等级参数都在引擎构造时注入，
//! 调整数值不需要改动引擎逻辑。可以从 `[reward]` 配置段加载。

use crate::error::{EngineError, Result};
use crate::models::Difficulty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 某个难度的基础奖励
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseReward {
    pub xp: u64,
    pub coins: u64,
}

/// 新手加成档位
///
/// 按顺序匹配，第一个 `max_completions > total_completed` 的档位生效
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtueTier {
    pub max_completions: u64,
    pub xp_multiplier: f64,
    pub coin_multiplier: f64,
}

/// 连续天数倍率档位（只作用于经验）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakTier {
    pub min_streak: u32,
    pub multiplier: f64,
}

/// 奖励配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub base_rewards: BTreeMap<Difficulty, BaseReward>,
    pub ftue_tiers: Vec<FtueTier>,
    pub streak_tiers: Vec<StreakTier>,
    /// 升到下一级所需经验 = level_xp_base * 当前等级
    pub level_xp_base: u64,
    /// 每升一级奖励的金币
    pub level_up_coin_bonus: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        let base_rewards = BTreeMap::from([
            (Difficulty::Easy, BaseReward { xp: 10, coins: 1 }),
            (Difficulty::Medium, BaseReward { xp: 20, coins: 2 }),
            (Difficulty::Hard, BaseReward { xp: 30, coins: 3 }),
        ]);

        Self {
            base_rewards,
            ftue_tiers: vec![
                FtueTier {
                    max_completions: 1,
                    xp_multiplier: 4.0,
                    coin_multiplier: 4.0,
                },
                FtueTier {
                    max_completions: 3,
                    xp_multiplier: 2.0,
                    coin_multiplier: 2.0,
                },
            ],
            streak_tiers: vec![
                StreakTier {
                    min_streak: 7,
                    multiplier: 1.5,
                },
                StreakTier {
                    min_streak: 3,
                    multiplier: 1.2,
                },
            ],
            level_xp_base: 100,
            level_up_coin_bonus: 5,
        }
    }
}

impl RewardConfig {
    /// 校验配置
    ///
    /// 缺少某个难度的基础奖励、等级基数为 0、倍率非法都属于配置缺陷，直接报错。
    pub fn validate(&self) -> Result<()> {
        for difficulty in Difficulty::ALL {
            if !self.base_rewards.contains_key(&difficulty) {
                return Err(EngineError::MissingBaseReward { difficulty });
            }
        }

        if self.level_xp_base == 0 {
            return Err(EngineError::InvalidConfig(
                "level_xp_base 必须大于 0".to_string(),
            ));
        }

        for (i, tier) in self.ftue_tiers.iter().enumerate() {
            if !is_valid_multiplier(tier.xp_multiplier)
                || !is_valid_multiplier(tier.coin_multiplier)
            {
                return Err(EngineError::InvalidConfig(format!(
                    "ftue_tiers[{}] 的倍率必须是非负有限数",
                    i
                )));
            }
        }

        let mut streak_tiers = self.streak_tiers.clone();
        streak_tiers.sort_by_key(|t| t.min_streak);
        let mut previous = 1.0_f64;
        for tier in &streak_tiers {
            if !is_valid_multiplier(tier.multiplier) {
                return Err(EngineError::InvalidConfig(format!(
                    "连续 {} 天档位的倍率必须是非负有限数",
                    tier.min_streak
                )));
            }
            // 倍率必须随连续天数单调不减
            if tier.multiplier < previous {
                return Err(EngineError::InvalidConfig(format!(
                    "连续 {} 天档位的倍率 {} 小于更低档位的 {}",
                    tier.min_streak, tier.multiplier, previous
                )));
            }
            previous = tier.multiplier;
        }

        Ok(())
    }
}

fn is_valid_multiplier(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
