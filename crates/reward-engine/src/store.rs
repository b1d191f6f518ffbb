//! 徽章目录
//!
//! 持有按确定顺序排列的已编译徽章：先按 `sort_order` 稳定排序，相同时保持插入顺序。
//! 目录构建后只读，可以在多次打卡之间复用以避免重复解析条件。

use crate::compiler::{CompiledBadge, ConditionCompiler, ParsedCondition};
use crate::models::BadgeDefinition;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// 已编译的徽章目录
#[derive(Debug, Clone, Default)]
pub struct BadgeCatalog {
    badges: Vec<CompiledBadge>,
}

impl BadgeCatalog {
    /// 编译徽章目录
    ///
    /// 重复 ID 只保留第一个出现的定义。
    pub fn compile(definitions: impl IntoIterator<Item = BadgeDefinition>) -> Self {
        let mut seen = HashSet::new();
        let mut badges = Vec::new();

        for (position, badge) in definitions.into_iter().enumerate() {
            if !seen.insert(badge.id.clone()) {
                warn!(badge_id = %badge.id, "徽章目录中存在重复 ID，已忽略后出现的定义");
                continue;
            }
            badges.push(ConditionCompiler::compile(badge, position));
        }

        // sort_by_key 是稳定排序，相同 sort_order 保持目录顺序
        badges.sort_by_key(|b| b.badge.sort_order);

        debug!(badge_count = badges.len(), "徽章目录已编译");
        Self { badges }
    }

    /// 获取徽章数量
    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    /// 按评估顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &CompiledBadge> {
        self.badges.iter()
    }

    /// 获取徽章
    pub fn get(&self, badge_id: &str) -> Option<&CompiledBadge> {
        self.badges.iter().find(|b| b.id() == badge_id)
    }

    /// 按评估顺序返回所有徽章 ID
    pub fn list_ids(&self) -> Vec<String> {
        self.badges.iter().map(|b| b.id().to_string()).collect()
    }

    /// 获取目录统计信息
    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            badges_count: self.badges.len(),
            ..Default::default()
        };

        for badge in &self.badges {
            if badge.badge.is_purchasable() {
                stats.purchasable_count += 1;
            }
            match badge.condition {
                ParsedCondition::XpThreshold(_) => stats.xp_threshold_count += 1,
                ParsedCondition::StreakThreshold(_) => stats.streak_threshold_count += 1,
                ParsedCondition::LevelThreshold(_) => stats.level_threshold_count += 1,
                ParsedCondition::CategoryMatch(_) => stats.category_match_count += 1,
                ParsedCondition::Unrecognized => stats.unrecognized_count += 1,
            }
        }

        stats
    }
}

impl FromIterator<BadgeDefinition> for BadgeCatalog {
    fn from_iter<T: IntoIterator<Item = BadgeDefinition>>(iter: T) -> Self {
        Self::compile(iter)
    }
}

/// 目录统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub badges_count: usize,
    pub purchasable_count: usize,
    pub xp_threshold_count: usize,
    pub streak_threshold_count: usize,
    pub level_threshold_count: usize,
    pub category_match_count: usize,
    pub unrecognized_count: usize,
}
