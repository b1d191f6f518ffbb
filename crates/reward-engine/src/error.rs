//! 奖励引擎错误类型
//!
//! 只有配置缺陷会让引擎失败；无徽章、无升级、零奖励都是正常结果。

use crate::models::Difficulty;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("奖励配置无效: {0}")]
    InvalidConfig(String),

    #[error("缺少难度 {difficulty} 的基础奖励配置")]
    MissingBaseReward { difficulty: Difficulty },

    #[error("徽章条件无效: '{condition}' - {reason}")]
    InvalidCondition { condition: String, reason: String },

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
