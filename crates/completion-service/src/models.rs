//! 存储层记录模型
//!
//! 记录在引擎快照之外附带所有者、展示字段和乐观并发版本号。

use chrono::{DateTime, Utc};
use reward_engine::{BadgeDefinition, CompletionResult, Difficulty, HabitState, UserProgress};
use serde::{Deserialize, Serialize};

/// 打卡频率
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
}

/// 用户记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub progress: UserProgress,
    /// 每次持久化 +1
    pub version: u64,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            progress: UserProgress::default(),
            version: 0,
        }
    }

    pub fn with_progress(mut self, progress: UserProgress) -> Self {
        self.progress = progress;
        self
    }
}

/// 习惯记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    pub id: String,
    /// 所有者用户 ID
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub estimated_minutes: Option<u32>,
    pub state: HabitState,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl HabitRecord {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// 创建习惯请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewHabit {
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub estimated_minutes: Option<u32>,
    /// 未指定时自动推断
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
}

impl NewHabit {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// 一次打卡的处理结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub result: CompletionResult,
    /// 持久化后的用户记录（今日已打卡时为原记录）
    pub user: UserRecord,
    pub habit: HabitRecord,
}

/// 一次徽章购买的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub badge: BadgeDefinition,
    /// 扣款并写入徽章后的用户记录
    pub user: UserRecord,
    /// 免费领取时为 0
    pub coins_spent: u64,
}
