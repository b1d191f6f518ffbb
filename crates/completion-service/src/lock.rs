//! 进程内按键串行化
//!
//! 同一用户的打卡请求排队执行，避免两个并发请求都基于同一份快照发放奖励。
//! 跨进程部署时仍依赖仓储的版本校验兜底。

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定键的锁，guard 释放前同键的其他调用会等待
    pub async fn acquire(&self, key: &str) -> KeyedLockGuard<'_> {
        // 先克隆出 Arc，避免跨 await 持有 DashMap 的分片锁
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        trace!(key, "等待打卡锁");
        KeyedLockGuard {
            locks: &self.locks,
            key: key.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// 持有期间独占该键，释放时若没有等待者则移除对应的锁
#[derive(Debug)]
pub struct KeyedLockGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        // 引用计数为 2：表中一份，本 guard 一份
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 2);
    }
}
