//! 徽章条件编译器
//!
//! 将自由文本条件解析为带标签的 [`ParsedCondition`]，每个徽章只解析一次并缓存在目录中。
//!
//! 语法（小写、去首尾空白后匹配，`n` 为第一个整数字面量）：
//! - 包含 `streak` → 连续天数阈值
//! - 以 `category:` 开头 → 分类匹配
//! - 以 `level` 开头 → 等级阈值
//! - 里程碑徽章且含整数 → 累计经验阈值
//! - 其余情况以及可购买徽章 → 无法识别，永远不满足

use crate::error::{EngineError, Result};
use crate::models::{BadgeDefinition, BadgeType};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::warn;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

const STREAK_KEYWORD: &str = "streak";
const CATEGORY_PREFIX: &str = "category:";
const LEVEL_PREFIX: &str = "level";

/// 解析后的条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParsedCondition {
    XpThreshold(u64),
    StreakThreshold(u32),
    LevelThreshold(u32),
    CategoryMatch(String),
    Unrecognized,
}

impl ParsedCondition {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// 编译后的徽章
#[derive(Debug, Clone)]
pub struct CompiledBadge {
    pub badge: BadgeDefinition,
    pub condition: ParsedCondition,
    /// 在原始目录中的位置（用于稳定排序）
    pub position: usize,
}

impl CompiledBadge {
    pub fn id(&self) -> &str {
        &self.badge.id
    }

    pub fn name(&self) -> &str {
        &self.badge.name
    }
}

/// 条件编译器
pub struct ConditionCompiler;

impl ConditionCompiler {
    /// 编译徽章
    ///
    /// 条件格式错误不会中断整个目录的编译：记录告警后按无法识别处理。
    pub fn compile(badge: BadgeDefinition, position: usize) -> CompiledBadge {
        let condition = match Self::parse(badge.badge_type, &badge.condition) {
            Ok(condition) => condition,
            Err(e) => {
                warn!(badge_id = %badge.id, badge_name = %badge.name, error = %e, "徽章条件无法识别");
                ParsedCondition::Unrecognized
            }
        };

        CompiledBadge {
            badge,
            condition,
            position,
        }
    }

    /// 解析条件表达式
    ///
    /// 可购买徽章和空条件直接返回 `Unrecognized`；其余无法解析的条件返回错误。
    pub fn parse(badge_type: BadgeType, condition: &str) -> Result<ParsedCondition> {
        if badge_type == BadgeType::Purchasable {
            return Ok(ParsedCondition::Unrecognized);
        }

        let cond = condition.trim().to_lowercase();
        if cond.is_empty() {
            return Ok(ParsedCondition::Unrecognized);
        }

        if cond.contains(STREAK_KEYWORD) {
            let n = Self::require_integer(condition, &cond, "连续天数条件缺少天数")?;
            return Ok(ParsedCondition::StreakThreshold(Self::to_u32(condition, n)?));
        }

        if let Some(label) = cond.strip_prefix(CATEGORY_PREFIX) {
            let label = label.trim();
            if label.is_empty() {
                return Err(invalid(condition, "分类条件缺少分类名"));
            }
            return Ok(ParsedCondition::CategoryMatch(label.to_string()));
        }

        if cond.starts_with(LEVEL_PREFIX) {
            let n = Self::require_integer(condition, &cond, "等级条件缺少等级")?;
            return Ok(ParsedCondition::LevelThreshold(Self::to_u32(condition, n)?));
        }

        if badge_type == BadgeType::Milestone {
            let n = Self::require_integer(condition, &cond, "里程碑条件缺少经验阈值")?;
            return Ok(ParsedCondition::XpThreshold(n));
        }

        Err(invalid(condition, "无法识别的条件表达式"))
    }

    /// 提取第一个整数字面量
    pub fn first_integer(cond: &str) -> Option<std::result::Result<u64, std::num::ParseIntError>> {
        INTEGER.find(cond).map(|m| m.as_str().parse::<u64>())
    }

    fn require_integer(original: &str, cond: &str, missing: &str) -> Result<u64> {
        match Self::first_integer(cond) {
            Some(Ok(n)) => Ok(n),
            Some(Err(e)) => Err(invalid(original, &format!("数值无效: {}", e))),
            None => Err(invalid(original, missing)),
        }
    }

    fn to_u32(original: &str, n: u64) -> Result<u32> {
        u32::try_from(n).map_err(|_| invalid(original, &format!("数值 {} 超出范围", n)))
    }
}

fn invalid(condition: &str, reason: &str) -> EngineError {
    EngineError::InvalidCondition {
        condition: condition.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(badge_type: BadgeType, cond: &str) -> ParsedCondition {
        ConditionCompiler::parse(badge_type, cond).unwrap()
    }

    #[test]
    fn test_milestone_xp_patterns() {
        for cond in ["20xp", "xp>=20", "xp>20", "XP:20", "  20 XP  "] {
            assert_eq!(
                parse(BadgeType::Milestone, cond),
                ParsedCondition::XpThreshold(20),
                "{}",
                cond
            );
        }
    }

    #[test]
    fn test_streak_patterns() {
        for cond in ["streak>=3", "3streak", "Streak:3", "3 day STREAK"] {
            assert_eq!(
                parse(BadgeType::Special, cond),
                ParsedCondition::StreakThreshold(3),
                "{}",
                cond
            );
        }
        // 里程碑徽章也按连续天数解析
        assert_eq!(
            parse(BadgeType::Milestone, "streak 7"),
            ParsedCondition::StreakThreshold(7)
        );
    }

    #[test]
    fn test_category_label() {
        assert_eq!(
            parse(BadgeType::Special, "Category: Study"),
            ParsedCondition::CategoryMatch("study".to_string())
        );
    }

    #[test]
    fn test_level_patterns() {
        assert_eq!(
            parse(BadgeType::Special, "level>=5"),
            ParsedCondition::LevelThreshold(5)
        );
        assert_eq!(
            parse(BadgeType::Starter, "Level 10"),
            ParsedCondition::LevelThreshold(10)
        );
    }

    #[test]
    fn test_purchasable_is_never_recognized() {
        assert_eq!(
            parse(BadgeType::Purchasable, "50xp"),
            ParsedCondition::Unrecognized
        );
        assert_eq!(
            parse(BadgeType::Purchasable, "level 2"),
            ParsedCondition::Unrecognized
        );
    }

    #[test]
    fn test_empty_condition_unrecognized() {
        assert_eq!(parse(BadgeType::Milestone, "   "), ParsedCondition::Unrecognized);
    }

    #[test]
    fn test_malformed_conditions_error() {
        for (badge_type, cond) in [
            (BadgeType::Milestone, "lots of xp"),
            (BadgeType::Special, "streak forever"),
            (BadgeType::Special, "category:"),
            (BadgeType::Special, "level up"),
            (BadgeType::Starter, "First Habit Completed"),
            (BadgeType::Special, "level 99999999999"),
        ] {
            let result = ConditionCompiler::parse(badge_type, cond);
            assert!(
                matches!(result, Err(EngineError::InvalidCondition { .. })),
                "{} should be invalid",
                cond
            );
        }
    }

    #[test]
    fn test_compile_downgrades_malformed_to_unrecognized() {
        let badge = BadgeDefinition::new("b-1", "Mystery", BadgeType::Milestone, "lots of xp");
        let compiled = ConditionCompiler::compile(badge, 0);
        assert_eq!(compiled.condition, ParsedCondition::Unrecognized);
        assert!(!compiled.condition.is_recognized());
        assert_eq!(compiled.id(), "b-1");
    }

    #[test]
    fn test_first_integer() {
        assert_eq!(ConditionCompiler::first_integer("xp>=20 and 30"), Some(Ok(20)));
        assert!(ConditionCompiler::first_integer("none").is_none());
    }
}
