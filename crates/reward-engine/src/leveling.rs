//! 等级阶梯
//!
//! 经验以“当前等级内余量 + 等级”表示，升级时扣除阈值，一次可以连升多级。

use crate::config::RewardConfig;
use serde::Serialize;

/// 升级计算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelOutcome {
    pub new_xp_remainder: u64,
    pub new_level: u32,
    pub leveled_up: bool,
    pub levels_gained: u32,
    pub bonus_coins: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct LevelingLadder {
    level_xp_base: u64,
    level_up_coin_bonus: u64,
}

impl LevelingLadder {
    pub fn new(config: &RewardConfig) -> Self {
        Self {
            level_xp_base: config.level_xp_base,
            level_up_coin_bonus: config.level_up_coin_bonus,
        }
    }

    /// 升到下一级所需经验
    pub fn threshold(&self, level: u32) -> u64 {
        self.level_xp_base.saturating_mul(u64::from(level.max(1)))
    }

    /// 累加经验并结算升级
    ///
    /// 等级低于 1 按 1 处理，保证阈值不为 0。
    pub fn apply(&self, xp_remainder: u64, level: u32, earned_xp: u64) -> LevelOutcome {
        let mut remainder = xp_remainder.saturating_add(earned_xp);
        let mut level = level.max(1);
        let mut levels_gained = 0u32;
        let mut bonus_coins = 0u64;

        let mut threshold = self.threshold(level);
        while threshold > 0 && remainder >= threshold {
            remainder -= threshold;
            level = level.saturating_add(1);
            levels_gained += 1;
            bonus_coins = bonus_coins.saturating_add(self.level_up_coin_bonus);
            threshold = self.threshold(level);
        }

        LevelOutcome {
            new_xp_remainder: remainder,
            new_level: level,
            leveled_up: levels_gained > 0,
            levels_gained,
            bonus_coins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> LevelingLadder {
        LevelingLadder::new(&RewardConfig::default())
    }

    #[test]
    fn test_single_level_up() {
        let outcome = ladder().apply(90, 1, 20);
        assert_eq!(outcome.new_level, 2);
        assert_eq!(outcome.new_xp_remainder, 10);
        assert_eq!(outcome.bonus_coins, 5);
        assert!(outcome.leveled_up);
    }

    #[test]
    fn test_no_level_up() {
        let outcome = ladder().apply(10, 1, 80);
        assert_eq!(outcome.new_level, 1);
        assert_eq!(outcome.new_xp_remainder, 90);
        assert_eq!(outcome.bonus_coins, 0);
        assert!(!outcome.leveled_up);
    }

    #[test]
    fn test_multi_level_jump() {
        // 100 (1->2) + 200 (2->3) = 300，剩余 50
        let outcome = ladder().apply(0, 1, 350);
        assert_eq!(outcome.new_level, 3);
        assert_eq!(outcome.new_xp_remainder, 50);
        assert_eq!(outcome.levels_gained, 2);
        assert_eq!(outcome.bonus_coins, 10);
    }

    #[test]
    fn test_exact_threshold_levels_up() {
        let outcome = ladder().apply(0, 2, 200);
        assert_eq!(outcome.new_level, 3);
        assert_eq!(outcome.new_xp_remainder, 0);
    }

    #[test]
    fn test_zero_xp_is_identity() {
        let ladder = ladder();
        for level in 1..=20u32 {
            for remainder in [0, 1, u64::from(level) * 50, ladder.threshold(level) - 1] {
                let outcome = ladder.apply(remainder, level, 0);
                assert_eq!(outcome.new_level, level);
                assert_eq!(outcome.new_xp_remainder, remainder);
                assert!(!outcome.leveled_up);
                assert_eq!(outcome.bonus_coins, 0);
            }
        }
    }

    #[test]
    fn test_remainder_invariant() {
        let ladder = ladder();
        for earned in [0, 1, 99, 100, 101, 999, 12_345] {
            let outcome = ladder.apply(0, 1, earned);
            assert!(outcome.new_xp_remainder < ladder.threshold(outcome.new_level));
        }
    }

    #[test]
    fn test_level_zero_treated_as_one() {
        let outcome = ladder().apply(0, 0, 100);
        assert_eq!(outcome.new_level, 2);
        assert_eq!(outcome.new_xp_remainder, 0);
    }
}
