//! 内存仓储
//!
//! 使用 DashMap 实现，适用于测试和单机开发环境。
//! 提交打卡时持有全局提交锁，保证用户与习惯两条记录的版本校验和写入是原子的。

use async_trait::async_trait;
use dashmap::DashMap;
use habit_shared::error::{HabitError, Result};
use reward_engine::BadgeDefinition;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::traits::ProgressRepository;
use crate::models::{HabitRecord, UserRecord};

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    users: DashMap<String, UserRecord>,
    habits: DashMap<String, HabitRecord>,
    badges: RwLock<Vec<BadgeDefinition>>,
    commit: Mutex<()>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置徽章目录
    pub fn with_badges(mut self, badges: Vec<BadgeDefinition>) -> Self {
        self.badges = RwLock::new(badges);
        self
    }

    /// 插入或覆盖用户
    pub fn insert_user(&self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }

    /// 替换徽章目录
    pub async fn replace_badges(&self, badges: Vec<BadgeDefinition>) {
        *self.badges.write().await = badges;
    }

    pub fn habit_count(&self) -> usize {
        self.habits.len()
    }
}

fn check_version(entity: &str, id: &str, expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        return Err(HabitError::Conflict {
            entity: entity.to_string(),
            id: id.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        let _commit = self.commit.lock().await;

        let current = self
            .users
            .get(&user.id)
            .map(|u| u.version)
            .ok_or_else(|| HabitError::not_found("user", user.id.as_str()))?;
        check_version("user", &user.id, user.version, current)?;

        let mut user = user.clone();
        user.version += 1;
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_habit(&self, habit_id: &str) -> Result<Option<HabitRecord>> {
        Ok(self.habits.get(habit_id).map(|h| h.clone()))
    }

    async fn list_habits_by_user(&self, user_id: &str) -> Result<Vec<HabitRecord>> {
        let mut habits: Vec<HabitRecord> = self
            .habits
            .iter()
            .filter(|entry| entry.value().is_owned_by(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        // DashMap 迭代顺序不稳定
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    async fn insert_habit(&self, habit: &HabitRecord) -> Result<()> {
        if self.habits.contains_key(&habit.id) {
            return Err(HabitError::AlreadyExists {
                entity: "habit".to_string(),
                id: habit.id.clone(),
            });
        }
        self.habits.insert(habit.id.clone(), habit.clone());
        Ok(())
    }

    async fn delete_habit(&self, habit_id: &str) -> Result<()> {
        let _commit = self.commit.lock().await;
        self.habits
            .remove(habit_id)
            .map(|_| ())
            .ok_or_else(|| HabitError::not_found("habit", habit_id))
    }

    async fn list_badges(&self) -> Result<Vec<BadgeDefinition>> {
        Ok(self.badges.read().await.clone())
    }

    async fn save_completion(&self, user: &UserRecord, habit: &HabitRecord) -> Result<()> {
        let _commit = self.commit.lock().await;

        let current_user = self
            .users
            .get(&user.id)
            .map(|u| u.version)
            .ok_or_else(|| HabitError::not_found("user", user.id.as_str()))?;
        let current_habit = self
            .habits
            .get(&habit.id)
            .map(|h| h.version)
            .ok_or_else(|| HabitError::not_found("habit", habit.id.as_str()))?;

        check_version("user", &user.id, user.version, current_user)?;
        check_version("habit", &habit.id, habit.version, current_habit)?;

        let mut user = user.clone();
        user.version += 1;
        let mut habit = habit.clone();
        habit.version += 1;

        debug!(
            user_id = %user.id,
            habit_id = %habit.id,
            user_version = user.version,
            habit_version = habit.version,
            "打卡结果已保存"
        );
        self.users.insert(user.id.clone(), user);
        self.habits.insert(habit.id.clone(), habit);
        Ok(())
    }
}
