//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use habit_shared::error::Result;
use reward_engine::BadgeDefinition;

use crate::models::{HabitRecord, UserRecord};

/// 打卡进度仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    // 用户
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// 保存用户记录，版本校验规则同 `save_completion`
    async fn save_user(&self, user: &UserRecord) -> Result<()>;

    // 习惯
    async fn get_habit(&self, habit_id: &str) -> Result<Option<HabitRecord>>;
    async fn list_habits_by_user(&self, user_id: &str) -> Result<Vec<HabitRecord>>;
    async fn insert_habit(&self, habit: &HabitRecord) -> Result<()>;
    async fn delete_habit(&self, habit_id: &str) -> Result<()>;

    // 徽章目录
    async fn list_badges(&self) -> Result<Vec<BadgeDefinition>>;

    /// 原子地保存一次打卡后的用户与习惯
    ///
    /// 传入记录的 `version` 为读取时的版本，与存储中的版本不一致时返回 `Conflict`，
    /// 成功后两条记录的版本各 +1。
    async fn save_completion(&self, user: &UserRecord, habit: &HabitRecord) -> Result<()>;
}
