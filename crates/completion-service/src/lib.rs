//! 习惯打卡服务
//!
//! 包装奖励引擎的调用方：负责加载快照、所有权校验、并发控制与持久化，
//! 引擎本身保持纯计算。

pub mod error;
pub mod lock;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{CompletionError, Result};
pub use lock::{KeyedLockGuard, KeyedLocks};
pub use models::{
    CompletionOutcome, Frequency, HabitRecord, NewHabit, PurchaseOutcome, UserRecord,
};
pub use repository::{InMemoryRepository, ProgressRepository};
pub use service::CompletionService;
