//! 连续天数追踪
//!
//! 日期比较使用调用方给出的日历日（同一固定时区），引擎本身不读取时钟。

use chrono::NaiveDate;
use serde::Serialize;

/// 连续天数状态转移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "streak", rename_all = "snake_case")]
pub enum StreakTransition {
    /// 今日已打卡，终止状态
    AlreadyCompletedToday,
    /// 昨日打过卡，连续天数 +1
    Continued(u32),
    /// 首次打卡或中断，重新从 1 开始
    Reset(u32),
}

impl StreakTransition {
    /// 新的连续天数，今日已打卡时为 None
    pub fn new_streak(&self) -> Option<u32> {
        match self {
            Self::AlreadyCompletedToday => None,
            Self::Continued(streak) | Self::Reset(streak) => Some(*streak),
        }
    }

    pub fn is_already_completed(&self) -> bool {
        matches!(self, Self::AlreadyCompletedToday)
    }
}

pub struct StreakTracker;

impl StreakTracker {
    /// 根据上次打卡日期计算状态转移
    ///
    /// 上次打卡日期晚于今天（时钟回拨或跨时区）按中断处理。
    pub fn evaluate(
        last_completed_date: Option<NaiveDate>,
        today: NaiveDate,
        current_streak: u32,
    ) -> StreakTransition {
        let Some(last) = last_completed_date else {
            return StreakTransition::Reset(1);
        };

        match (today - last).num_days() {
            0 => StreakTransition::AlreadyCompletedToday,
            1 => StreakTransition::Continued(current_streak.saturating_add(1)),
            _ => StreakTransition::Reset(1),
        }
    }
}
