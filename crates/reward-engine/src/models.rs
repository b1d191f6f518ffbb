//! 奖励引擎领域模型
//!
//! 所有模型都是不可变快照：引擎读入旧快照，返回新快照，持久化由调用方负责。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 习惯难度
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("unknown difficulty: {}", s)),
        }
    }
}

/// 徽章类型
///
/// 可购买徽章只能通过显式的金币兑换获得，规则引擎永远不会评估它们
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeType {
    /// 新手徽章
    #[default]
    Starter,
    /// 里程碑徽章 - 累计经验跨过阈值自动解锁
    Milestone,
    /// 特殊徽章
    Special,
    /// 可购买徽章 - 金币兑换
    Purchasable,
}

impl BadgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Milestone => "milestone",
            Self::Special => "special",
            Self::Purchasable => "purchasable",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 徽章评估的触发来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// 习惯打卡，连续天数和分类条件只在此触发下生效
    #[default]
    CompleteHabit,
    /// 非打卡的重新评估（如徽章目录变更后补发）
    Recheck,
}

/// 徽章定义（只读输入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    #[serde(rename = "type", default)]
    pub badge_type: BadgeType,
    /// 自由文本条件表达式，如 "50xp"、"streak>=3"、"level 5"、"category:study"
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub xp_reward: u64,
    #[serde(default)]
    pub coin_reward: u64,
    /// 仅对可购买徽章有意义
    #[serde(default)]
    pub coin_cost: u64,
    /// 评估顺序键，相同时保持目录中的插入顺序
    #[serde(default)]
    pub sort_order: i32,
}

fn default_emoji() -> String {
    "🏅".to_string()
}

impl BadgeDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        badge_type: BadgeType,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            emoji: default_emoji(),
            badge_type,
            condition: condition.into(),
            xp_reward: 0,
            coin_reward: 0,
            coin_cost: 0,
            sort_order: 0,
        }
    }

    pub fn with_rewards(mut self, xp_reward: u64, coin_reward: u64) -> Self {
        self.xp_reward = xp_reward;
        self.coin_reward = coin_reward;
        self
    }

    pub fn with_coin_cost(mut self, coin_cost: u64) -> Self {
        self.coin_cost = coin_cost;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn is_purchasable(&self) -> bool {
        self.badge_type == BadgeType::Purchasable
    }
}

/// 用户进度快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    /// 当前等级内累计的经验
    pub xp_remainder: u64,
    /// 历史累计经验（单调递增）
    pub total_xp_earned: u64,
    pub coins: u64,
    /// 历史累计金币（单调递增）
    pub total_coins_earned: u64,
    pub level: u32,
    /// 历史打卡总次数（单调递增）
    pub total_completed: u64,
    pub owned_badge_ids: BTreeSet<String>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            xp_remainder: 0,
            total_xp_earned: 0,
            coins: 0,
            total_coins_earned: 0,
            level: 1,
            total_completed: 0,
            owned_badge_ids: BTreeSet::new(),
        }
    }
}

/// 习惯状态快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HabitState {
    pub difficulty: Difficulty,
    pub streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub completed_count: u64,
    pub category: Option<String>,
}

/// 单次打卡请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub difficulty: Difficulty,
    #[serde(default)]
    pub last_completed_date: Option<NaiveDate>,
    pub today: NaiveDate,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub habit_completed_count: u64,
    #[serde(default)]
    pub total_completed_by_user: u64,
    #[serde(default)]
    pub user_xp_remainder: u64,
    #[serde(default = "default_level")]
    pub user_level: u32,
    #[serde(default)]
    pub user_coins: u64,
    #[serde(default)]
    pub user_total_xp_earned: u64,
    #[serde(default)]
    pub user_total_coins_earned: u64,
    #[serde(default)]
    pub owned_badge_ids: BTreeSet<String>,
    #[serde(default)]
    pub badge_catalog: Vec<BadgeDefinition>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_level() -> u32 {
    1
}

impl CompletionRequest {
    /// 由习惯与用户快照组装请求
    pub fn from_snapshots(
        habit: &HabitState,
        progress: &UserProgress,
        today: NaiveDate,
        badge_catalog: Vec<BadgeDefinition>,
    ) -> Self {
        Self {
            difficulty: habit.difficulty,
            last_completed_date: habit.last_completed_date,
            today,
            current_streak: habit.streak,
            habit_completed_count: habit.completed_count,
            total_completed_by_user: progress.total_completed,
            user_xp_remainder: progress.xp_remainder,
            user_level: progress.level,
            user_coins: progress.coins,
            user_total_xp_earned: progress.total_xp_earned,
            user_total_coins_earned: progress.total_coins_earned,
            owned_badge_ids: progress.owned_badge_ids.clone(),
            badge_catalog,
            category: habit.category.clone(),
        }
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// 单次打卡结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub already_completed_today: bool,
    pub new_streak: u32,
    /// 本次打卡获得的经验（不含徽章奖励）
    pub xp_earned: u64,
    /// 本次打卡获得的金币（不含升级奖励与徽章奖励）
    pub coins_earned: u64,
    pub leveled_up: bool,
    pub new_level: u32,
    pub new_xp_remainder: u64,
    pub new_coins: u64,
    pub new_total_xp_earned: u64,
    pub new_total_coins_earned: u64,
    pub unlocked_badges: Vec<BadgeDefinition>,
    pub new_completed_count: u64,
    pub new_total_completed: u64,
    pub new_last_completed_date: Option<NaiveDate>,
    /// 升级奖励金币合计
    pub bonus_coins: u64,
    /// 解锁徽章附带的经验合计
    pub badge_xp: u64,
    /// 解锁徽章附带的金币合计
    pub badge_coins: u64,
    pub new_owned_badge_ids: BTreeSet<String>,
}

impl CompletionResult {
    /// 今日已打卡时的无变化结果
    pub fn unchanged(request: &CompletionRequest) -> Self {
        Self {
            already_completed_today: true,
            new_streak: request.current_streak,
            xp_earned: 0,
            coins_earned: 0,
            leveled_up: false,
            new_level: request.user_level,
            new_xp_remainder: request.user_xp_remainder,
            new_coins: request.user_coins,
            new_total_xp_earned: request.user_total_xp_earned,
            new_total_coins_earned: request.user_total_coins_earned,
            unlocked_badges: Vec::new(),
            new_completed_count: request.habit_completed_count,
            new_total_completed: request.total_completed_by_user,
            new_last_completed_date: request.last_completed_date,
            bonus_coins: 0,
            badge_xp: 0,
            badge_coins: 0,
            new_owned_badge_ids: request.owned_badge_ids.clone(),
        }
    }

    /// 基于旧的习惯快照生成新快照
    pub fn apply_to_habit(&self, habit: &HabitState) -> HabitState {
        if self.already_completed_today {
            return habit.clone();
        }
        HabitState {
            streak: self.new_streak,
            last_completed_date: self.new_last_completed_date,
            completed_count: self.new_completed_count,
            ..habit.clone()
        }
    }

    /// 基于旧的用户快照生成新快照
    pub fn apply_to_progress(&self, progress: &UserProgress) -> UserProgress {
        if self.already_completed_today {
            return progress.clone();
        }
        UserProgress {
            xp_remainder: self.new_xp_remainder,
            total_xp_earned: self.new_total_xp_earned,
            coins: self.new_coins,
            total_coins_earned: self.new_total_coins_earned,
            level: self.new_level,
            total_completed: self.new_total_completed,
            owned_badge_ids: self.new_owned_badge_ids.clone(),
        }
    }
}

/// 非打卡触发的徽章重新评估请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecheckRequest {
    pub progress: UserProgress,
    #[serde(default)]
    pub badge_catalog: Vec<BadgeDefinition>,
}

/// 徽章重新评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecheckResult {
    pub progress: UserProgress,
    pub unlocked_badges: Vec<BadgeDefinition>,
    pub leveled_up: bool,
}
