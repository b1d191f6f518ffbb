//! 统一错误处理模块
//!
//! 定义调用方（存储、鉴权、配置）共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 奖励引擎本身的配置错误定义在 reward-engine 中，业务不匹配（无徽章、无升级）不是错误。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum HabitError {
    // ==================== 存储错误 ====================
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("记录已存在: {entity} id={id}")]
    AlreadyExists { entity: String, id: String },

    /// 乐观并发校验失败：持久化时快照版本已被其他请求推进
    #[error("并发冲突: {entity} id={id} 期望版本 {expected}, 实际版本 {actual}")]
    Conflict {
        entity: String,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("持久化失败: {0}")]
    Persistence(String),

    // ==================== 业务逻辑错误 ====================
    #[error("金币不足: 需要 {required}, 实际 {actual}")]
    InsufficientCoins { required: u64, actual: u64 },

    #[error("徽章不可用: {reason}")]
    BadgeUnavailable { reason: String },

    // ==================== 权限错误 ====================
    #[error("未授权访问")]
    Unauthorized,

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, HabitError>;

impl HabitError {
    /// 构造 NotFound 错误
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Conflict { .. } => "CONFLICT",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::InsufficientCoins { .. } => "INSUFFICIENT_COINS",
            Self::BadgeUnavailable { .. } => "BADGE_UNAVAILABLE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 并发冲突重新加载快照后可以重试；存储层故障交给调用方决定重试策略。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Persistence(_))
    }
}
