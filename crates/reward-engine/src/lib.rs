//! 习惯打卡奖励引擎
//!
//! 每次打卡调用一次，纯计算、无 I/O：
//! - 连续天数追踪（同日幂等）
//! - 按难度、新手加成、连续天数计算经验与金币
//! - 等级阶梯结算
//! - 徽章条件解析、缓存与顺序评估

pub mod cli;
pub mod compiler;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod evaluator;
pub mod leveling;
pub mod models;
pub mod orchestrator;
pub mod reward;
pub mod stats;
pub mod store;
pub mod streak;

pub use compiler::{CompiledBadge, ConditionCompiler, ParsedCondition};
pub use config::{BaseReward, FtueTier, RewardConfig, StreakTier};
pub use difficulty::classify_difficulty;
pub use error::{EngineError, Result};
pub use evaluator::{BadgeContext, BadgeEvaluation, BadgeEvaluator};
pub use leveling::{LevelOutcome, LevelingLadder};
pub use models::{
    BadgeDefinition, BadgeType, CompletionRequest, CompletionResult, Difficulty, HabitState,
    RecheckRequest, RecheckResult, Trigger, UserProgress,
};
pub use orchestrator::{CompletionStage, RewardEngine};
pub use reward::{Reward, RewardCalculator};
pub use stats::ProgressStats;
pub use store::{BadgeCatalog, CatalogStats};
pub use streak::{StreakTracker, StreakTransition};
