//! 打卡服务错误类型
//!
//! 在共享库 HabitError 基础上包装奖励引擎的配置错误，
//! 调用方可以统一通过 `code()` 与 `is_retryable()` 判断处理方式。

use habit_shared::error::HabitError;
use reward_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// 奖励配置缺陷，重试无意义
    #[error("奖励引擎错误: {0}")]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Shared(#[from] HabitError),
}

pub type Result<T> = std::result::Result<T, CompletionError>;

impl CompletionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Engine(_) => "ENGINE_ERROR",
            Self::Shared(e) => e.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Engine(_) => false,
            Self::Shared(e) => e.is_retryable(),
        }
    }
}
