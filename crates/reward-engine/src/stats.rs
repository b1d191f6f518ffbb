//! 用户进度统计

use crate::models::HabitState;
use serde::{Deserialize, Serialize};

/// 个人主页展示的打卡统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_completions: u64,
    pub longest_streak: u32,
    /// 连续天数大于 0 的习惯数
    pub active_streaks: usize,
    pub total_habits: usize,
}

impl ProgressStats {
    pub fn from_habits<'a>(habits: impl IntoIterator<Item = &'a HabitState>) -> Self {
        habits
            .into_iter()
            .fold(Self::default(), |mut stats, habit| {
                stats.total_habits += 1;
                stats.total_completions = stats.total_completions.saturating_add(habit.completed_count);
                stats.longest_streak = stats.longest_streak.max(habit.streak);
                if habit.streak > 0 {
                    stats.active_streaks += 1;
                }
                stats
            })
    }
}
