//! 共享库
//!
//! 包含奖励引擎与打卡服务共用的配置、错误处理、可观测性等基础设施代码。

pub mod config;
pub mod error;
pub mod observability;
