//! 打卡服务
//!
//! 负责奖励引擎之外的全部工作：
//! - 加载用户、习惯和徽章目录
//! - 存在性与所有权校验
//! - 按用户串行化打卡
//! - 持久化引擎返回的新快照
//! - 缓存已编译的徽章目录，目录变化时才重新编译
//! - 徽章购买与习惯删除
//! - 记录指标
//!
//! ## 打卡流程
//!
//! 1. 获取用户锁 -> 2. 加载并校验习惯与用户 -> 3. 调用引擎 -> 4. 今日已打卡则直接返回
//!    -> 5. 版本校验后保存 -> 6. 记录指标

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use habit_shared::error::HabitError;
use habit_shared::observability::metrics;
use reward_engine::{
    BadgeCatalog, BadgeDefinition, CompletionRequest, HabitState, ProgressStats, RewardEngine,
    classify_difficulty,
};

use crate::error::{CompletionError, Result};
use crate::lock::KeyedLocks;
use crate::models::{CompletionOutcome, HabitRecord, NewHabit, PurchaseOutcome, UserRecord};
use crate::repository::ProgressRepository;

pub struct CompletionService<R>
where
    R: ProgressRepository,
{
    repo: Arc<R>,
    engine: Arc<RewardEngine>,
    locks: KeyedLocks,
    catalog: RwLock<Option<CachedCatalog>>,
}

/// 编译结果连同其来源定义一起缓存，来源不变时直接复用
struct CachedCatalog {
    source: Vec<BadgeDefinition>,
    compiled: Arc<BadgeCatalog>,
}

impl<R> CompletionService<R>
where
    R: ProgressRepository,
{
    pub fn new(repo: Arc<R>, engine: Arc<RewardEngine>) -> Self {
        Self {
            repo,
            engine,
            locks: KeyedLocks::new(),
            catalog: RwLock::new(None),
        }
    }

    /// 以服务器本地日期打卡
    pub async fn complete_habit_today(
        &self,
        user_id: &str,
        habit_id: &str,
    ) -> Result<CompletionOutcome> {
        self.complete_habit(user_id, habit_id, Local::now().date_naive())
            .await
    }

    /// 打卡
    #[instrument(skip(self))]
    pub async fn complete_habit(
        &self,
        user_id: &str,
        habit_id: &str,
        today: NaiveDate,
    ) -> Result<CompletionOutcome> {
        let start = Instant::now();
        let outcome = self.complete_locked(user_id, habit_id, today).await;
        let duration = start.elapsed().as_secs_f64();

        match &outcome {
            Ok(o) if o.result.already_completed_today => {
                metrics::record_completion("already_completed", 0, duration);
            }
            Ok(o) => {
                metrics::record_completion("completed", o.result.xp_earned, duration);
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "打卡失败");
                metrics::record_completion("failed", 0, duration);
            }
        }

        outcome
    }

    async fn complete_locked(
        &self,
        user_id: &str,
        habit_id: &str,
        today: NaiveDate,
    ) -> Result<CompletionOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        let habit = self
            .repo
            .get_habit(habit_id)
            .await?
            .ok_or_else(|| HabitError::not_found("habit", habit_id))?;
        if !habit.is_owned_by(user_id) {
            return Err(HabitError::Unauthorized.into());
        }
        let user = self.load_user(user_id).await?;

        let catalog = self.catalog().await?;
        let request =
            CompletionRequest::from_snapshots(&habit.state, &user.progress, today, Vec::new());
        let result = self.engine.complete_with_catalog(&request, &catalog)?;

        if result.already_completed_today {
            info!(streak = result.new_streak, "今日已打卡");
            return Ok(CompletionOutcome { result, user, habit });
        }

        let mut new_user = UserRecord {
            progress: result.apply_to_progress(&user.progress),
            ..user
        };
        let mut new_habit = HabitRecord {
            state: result.apply_to_habit(&habit.state),
            ..habit
        };
        self.repo.save_completion(&new_user, &new_habit).await?;
        new_user.version += 1;
        new_habit.version += 1;

        for badge in &result.unlocked_badges {
            metrics::record_badge_unlock(badge.badge_type.as_str());
            info!(badge_id = %badge.id, badge_name = %badge.name, "徽章已解锁");
        }
        metrics::record_level_ups(u64::from(
            result.new_level.saturating_sub(request.user_level.max(1)),
        ));

        info!(
            new_streak = result.new_streak,
            xp_earned = result.xp_earned,
            coins_earned = result.coins_earned,
            leveled_up = result.leveled_up,
            new_level = result.new_level,
            "打卡成功"
        );

        Ok(CompletionOutcome {
            result,
            user: new_user,
            habit: new_habit,
        })
    }

    /// 创建习惯
    ///
    /// 未指定难度时根据标题、描述和预计耗时推断。
    #[instrument(skip(self, new_habit))]
    pub async fn create_habit(&self, user_id: &str, new_habit: NewHabit) -> Result<HabitRecord> {
        let title = new_habit.title.trim();
        if title.is_empty() {
            return Err(HabitError::InvalidArgument {
                field: "title".to_string(),
                message: "标题不能为空".to_string(),
            }
            .into());
        }
        self.load_user(user_id).await?;

        let difficulty = new_habit.difficulty.unwrap_or_else(|| {
            classify_difficulty(title, &new_habit.description, new_habit.estimated_minutes)
        });

        let habit = HabitRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: new_habit.description.trim().to_string(),
            frequency: new_habit.frequency,
            estimated_minutes: new_habit.estimated_minutes,
            state: HabitState {
                difficulty,
                category: new_habit.category,
                ..Default::default()
            },
            created_at: Utc::now(),
            version: 0,
        };
        self.repo.insert_habit(&habit).await?;

        info!(habit_id = %habit.id, %difficulty, "习惯已创建");
        Ok(habit)
    }

    /// 删除习惯，只有所有者可以删除
    #[instrument(skip(self))]
    pub async fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(user_id).await;

        let habit = self
            .repo
            .get_habit(habit_id)
            .await?
            .ok_or_else(|| HabitError::not_found("habit", habit_id))?;
        if !habit.is_owned_by(user_id) {
            return Err(HabitError::Unauthorized.into());
        }

        self.repo.delete_habit(habit_id).await?;
        info!("习惯已删除");
        Ok(())
    }

    /// 购买徽章
    ///
    /// 只有可购买类型的徽章能买；价格为 0 时免费领取；已拥有或金币不足时拒绝。
    /// 购买只扣减 `coins`，不影响累计获得金币。
    #[instrument(skip(self))]
    pub async fn purchase_badge(&self, user_id: &str, badge_id: &str) -> Result<PurchaseOutcome> {
        let outcome = self.purchase_locked(user_id, badge_id).await;
        match &outcome {
            Ok(o) if o.coins_spent == 0 => metrics::record_badge_purchase("claimed", 0),
            Ok(o) => metrics::record_badge_purchase("purchased", o.coins_spent),
            Err(e) => {
                warn!(error = %e, code = e.code(), "徽章购买失败");
                metrics::record_badge_purchase("rejected", 0);
            }
        }
        outcome
    }

    async fn purchase_locked(&self, user_id: &str, badge_id: &str) -> Result<PurchaseOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        let catalog = self.catalog().await?;
        let badge = catalog
            .get(badge_id)
            .map(|compiled| compiled.badge.clone())
            .ok_or_else(|| HabitError::not_found("badge", badge_id))?;
        let mut user = self.load_user(user_id).await?;

        if !badge.is_purchasable() {
            return Err(HabitError::BadgeUnavailable {
                reason: format!("徽章 {} 不可购买", badge.id),
            }
            .into());
        }
        if user.progress.owned_badge_ids.contains(&badge.id) {
            return Err(HabitError::AlreadyExists {
                entity: "user_badge".to_string(),
                id: badge.id.clone(),
            }
            .into());
        }

        let cost = badge.coin_cost;
        if user.progress.coins < cost {
            return Err(HabitError::InsufficientCoins {
                required: cost,
                actual: user.progress.coins,
            }
            .into());
        }

        user.progress.coins -= cost;
        user.progress.owned_badge_ids.insert(badge.id.clone());
        self.repo.save_user(&user).await?;
        user.version += 1;

        info!(coins_spent = cost, coins_left = user.progress.coins, "徽章已购买");
        Ok(PurchaseOutcome {
            badge,
            user,
            coins_spent: cost,
        })
    }

    /// 用户打卡统计
    pub async fn profile_stats(&self, user_id: &str) -> Result<ProgressStats> {
        self.load_user(user_id).await?;
        let habits = self.repo.list_habits_by_user(user_id).await?;
        Ok(ProgressStats::from_habits(habits.iter().map(|h| &h.state)))
    }

    /// 获取已编译的徽章目录
    ///
    /// 仓储中的定义与上次编译时一致则复用缓存，否则重新编译并替换。
    async fn catalog(&self) -> Result<Arc<BadgeCatalog>> {
        let badges = self.repo.list_badges().await?;

        {
            let cached = self.catalog.read().await;
            if let Some(cached) = cached.as_ref()
                && cached.source == badges
            {
                return Ok(cached.compiled.clone());
            }
        }

        let compiled = Arc::new(BadgeCatalog::compile(badges.iter().cloned()));
        debug!(badge_count = compiled.len(), "徽章目录已重新编译");
        *self.catalog.write().await = Some(CachedCatalog {
            source: badges,
            compiled: compiled.clone(),
        });
        Ok(compiled)
    }

    async fn load_user(&self, user_id: &str) -> Result<UserRecord> {
        self.repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| CompletionError::from(HabitError::not_found("user", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, MockProgressRepository};
    use reward_engine::{BadgeType, Difficulty, RewardConfig, UserProgress};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn engine() -> Arc<RewardEngine> {
        Arc::new(RewardEngine::new(RewardConfig::default()).unwrap())
    }

    fn seeded() -> (Arc<InMemoryRepository>, CompletionService<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new().with_badges(vec![
            BadgeDefinition::new("bronze", "Bronze Starter", BadgeType::Milestone, "20xp")
                .with_rewards(0, 5),
            BadgeDefinition::new("pride", "Pride Flag", BadgeType::Purchasable, "")
                .with_coin_cost(30),
            BadgeDefinition::new("sticker", "Sticker", BadgeType::Purchasable, ""),
        ]));
        repo.insert_user(UserRecord::new("u-1", "alice"));
        repo.insert_user(UserRecord::new("u-2", "bob"));
        repo.insert_user(UserRecord::new("u-3", "carol").with_progress(UserProgress {
            coins: 40,
            total_coins_earned: 40,
            ..Default::default()
        }));
        let service = CompletionService::new(repo.clone(), engine());
        (repo, service)
    }

    #[tokio::test]
    async fn test_complete_persists_new_state() {
        let (repo, service) = seeded();
        let habit = service
            .create_habit(
                "u-1",
                NewHabit {
                    difficulty: Some(Difficulty::Medium),
                    ..NewHabit::new("Read")
                },
            )
            .await
            .unwrap();

        let outcome = service.complete_habit("u-1", &habit.id, day(10)).await.unwrap();
        assert_eq!(outcome.result.xp_earned, 80);
        assert_eq!(outcome.result.unlocked_badges.len(), 1);
        assert_eq!(outcome.user.version, 1);

        let stored = repo.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(stored, outcome.user);
        assert_eq!(stored.progress.coins, 8 + 5);
        assert!(stored.progress.owned_badge_ids.contains("bronze"));

        let stored_habit = repo.get_habit(&habit.id).await.unwrap().unwrap();
        assert_eq!(stored_habit.state.streak, 1);
        assert_eq!(stored_habit.state.last_completed_date, Some(day(10)));
    }

    #[tokio::test]
    async fn test_second_completion_same_day_changes_nothing() {
        let (repo, service) = seeded();
        let habit = service.create_habit("u-1", NewHabit::new("Walk")).await.unwrap();

        service.complete_habit("u-1", &habit.id, day(10)).await.unwrap();
        let before = repo.get_user("u-1").await.unwrap().unwrap();

        let again = service.complete_habit("u-1", &habit.id, day(10)).await.unwrap();
        assert!(again.result.already_completed_today);
        assert_eq!(repo.get_user("u-1").await.unwrap().unwrap(), before);
        assert_eq!(again.user, before);
    }

    #[tokio::test]
    async fn test_concurrent_completions_apply_once() {
        let (repo, service) = seeded();
        let service = Arc::new(service);
        let habit = service.create_habit("u-1", NewHabit::new("Yoga")).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                let habit_id = habit.id.clone();
                tokio::spawn(async move { service.complete_habit("u-1", &habit_id, day(10)).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if !outcome.result.already_completed_today {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        let user = repo.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(user.progress.total_completed, 1);
        assert_eq!(user.version, 1);
    }

    #[tokio::test]
    async fn test_other_users_habit_is_unauthorized() {
        let (_repo, service) = seeded();
        let habit = service.create_habit("u-1", NewHabit::new("Gym")).await.unwrap();

        let err = service
            .complete_habit("u-2", &habit.id, day(10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_create_habit_classifies_difficulty() {
        let (_repo, service) = seeded();

        let habit = service
            .create_habit(
                "u-1",
                NewHabit {
                    estimated_minutes: Some(90),
                    ..NewHabit::new("  Drink water  ")
                },
            )
            .await
            .unwrap();
        assert_eq!(habit.title, "Drink water");
        assert_eq!(habit.state.difficulty, Difficulty::Hard);

        let habit = service
            .create_habit("u-1", NewHabit::new("Drink water"))
            .await
            .unwrap();
        assert_eq!(habit.state.difficulty, Difficulty::Easy);
    }

    #[tokio::test]
    async fn test_create_habit_validation() {
        let (_repo, service) = seeded();

        let err = service.create_habit("u-1", NewHabit::new("   ")).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");

        let err = service
            .create_habit("ghost", NewHabit::new("Read"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_profile_stats() {
        let (_repo, service) = seeded();
        let read = service.create_habit("u-1", NewHabit::new("Read")).await.unwrap();
        service.create_habit("u-1", NewHabit::new("Gym")).await.unwrap();
        service.create_habit("u-2", NewHabit::new("Cook")).await.unwrap();

        service.complete_habit("u-1", &read.id, day(9)).await.unwrap();
        service.complete_habit("u-1", &read.id, day(10)).await.unwrap();

        let stats = service.profile_stats("u-1").await.unwrap();
        assert_eq!(stats.total_habits, 2);
        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.active_streaks, 1);
    }

    #[tokio::test]
    async fn test_missing_habit_not_found() {
        let mut repo = MockProgressRepository::new();
        repo.expect_get_habit().returning(|_| Ok(None));
        repo.expect_save_completion().never();

        let service = CompletionService::new(Arc::new(repo), engine());
        let err = service
            .complete_habit("u-1", "missing", day(10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::Shared(HabitError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_storage_conflict_is_surfaced() {
        let mut repo = MockProgressRepository::new();
        repo.expect_get_habit().returning(|id| {
            Ok(Some(HabitRecord {
                id: id.to_string(),
                user_id: "u-1".to_string(),
                title: "Read".to_string(),
                description: String::new(),
                frequency: Default::default(),
                estimated_minutes: None,
                state: HabitState::default(),
                created_at: Utc::now(),
                version: 3,
            }))
        });
        repo.expect_get_user()
            .returning(|id| Ok(Some(UserRecord::new(id, "alice"))));
        repo.expect_list_badges().returning(|| Ok(Vec::new()));
        repo.expect_save_completion().times(1).returning(|user, _| {
            Err(HabitError::Conflict {
                entity: "user".to_string(),
                id: user.id.clone(),
                expected: 0,
                actual: 1,
            })
        });

        let service = CompletionService::new(Arc::new(repo), engine());
        let err = service
            .complete_habit("u-1", "h-1", day(10))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_user_locks_released_after_requests() {
        let (_repo, service) = seeded();
        let service = Arc::new(service);
        let habit = service.create_habit("u-1", NewHabit::new("Read")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50u32 {
            let service = service.clone();
            let habit_id = habit.id.clone();
            handles.push(tokio::spawn(async move {
                let _ = service
                    .complete_habit("u-1", &habit_id, day(1 + i % 28))
                    .await;
                let _ = service
                    .complete_habit(&format!("ghost-{}", i), &habit_id, day(1))
                    .await;
                let _ = service.purchase_badge(&format!("ghost-{}", i), "pride").await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_purchase_badge_spends_coins() {
        let (repo, service) = seeded();

        let outcome = service.purchase_badge("u-3", "pride").await.unwrap();
        assert_eq!(outcome.coins_spent, 30);
        assert_eq!(outcome.user.progress.coins, 10);
        assert_eq!(outcome.user.progress.total_coins_earned, 40);
        assert!(outcome.user.progress.owned_badge_ids.contains("pride"));
        assert_eq!(outcome.user.version, 1);

        let stored = repo.get_user("u-3").await.unwrap().unwrap();
        assert_eq!(stored, outcome.user);
    }

    #[tokio::test]
    async fn test_free_badge_is_claimed() {
        let (_repo, service) = seeded();

        let outcome = service.purchase_badge("u-1", "sticker").await.unwrap();
        assert_eq!(outcome.coins_spent, 0);
        assert_eq!(outcome.user.progress.coins, 0);
        assert!(outcome.user.progress.owned_badge_ids.contains("sticker"));
    }

    #[tokio::test]
    async fn test_purchase_rejections() {
        let (repo, service) = seeded();

        let err = service.purchase_badge("u-3", "bronze").await.unwrap_err();
        assert_eq!(err.code(), "BADGE_UNAVAILABLE");

        let err = service.purchase_badge("u-3", "unknown").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = service.purchase_badge("ghost", "pride").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = service.purchase_badge("u-1", "pride").await.unwrap_err();
        assert!(matches!(
            err,
            CompletionError::Shared(HabitError::InsufficientCoins {
                required: 30,
                actual: 0
            })
        ));
        assert_eq!(repo.get_user("u-1").await.unwrap().unwrap().version, 0);

        service.purchase_badge("u-3", "pride").await.unwrap();
        let err = service.purchase_badge("u-3", "pride").await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_EXISTS");
        assert_eq!(repo.get_user("u-3").await.unwrap().unwrap().progress.coins, 10);
    }

    #[tokio::test]
    async fn test_delete_habit_requires_owner() {
        let (repo, service) = seeded();
        let habit = service.create_habit("u-1", NewHabit::new("Read")).await.unwrap();

        let err = service.delete_habit("u-2", &habit.id).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(repo.habit_count(), 1);

        service.delete_habit("u-1", &habit.id).await.unwrap();
        assert_eq!(repo.habit_count(), 0);

        let err = service.delete_habit("u-1", &habit.id).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        let err = service
            .complete_habit("u-1", &habit.id, day(10))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_catalog_reused_until_badges_change() {
        let (repo, service) = seeded();

        let first = service.catalog().await.unwrap();
        let second = service.catalog().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);

        repo.replace_badges(vec![BadgeDefinition::new(
            "silver",
            "Silver Learner",
            BadgeType::Milestone,
            "50xp",
        )])
        .await;
        let third = service.catalog().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.list_ids(), vec!["silver"]);
    }
}
