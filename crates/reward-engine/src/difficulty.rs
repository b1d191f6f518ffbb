//! 习惯难度分类
//!
//! 创建习惯时未指定难度，则根据预计耗时和标题/描述中的关键词推断。

use crate::models::Difficulty;

// stretch 出现两次，命中时计 -2
const EASY_KEYWORDS: &[&str] = &[
    "water", "drink", "stretch", "brush", "smile", "bed", "hydrate", "stretch",
];
const MEDIUM_KEYWORDS: &[&str] = &[
    "read", "study", "meditate", "walk", "yoga", "cook", "practice", "learn",
];
const HARD_KEYWORDS: &[&str] = &[
    "workout",
    "gym",
    "run",
    "project",
    "coding",
    "solve",
    "assignment",
    "practice hard",
];

/// 推断习惯难度
///
/// 预计耗时优先：≥60 分钟为困难，≥30 分钟为中等，1~15 分钟为简单；
/// 其余情况按关键词打分，简单词 -1、中等词 +1、困难词 +2。
pub fn classify_difficulty(
    title: &str,
    description: &str,
    estimated_minutes: Option<u32>,
) -> Difficulty {
    match estimated_minutes.unwrap_or(0) {
        60.. => return Difficulty::Hard,
        30.. => return Difficulty::Medium,
        1..=15 => return Difficulty::Easy,
        _ => {}
    }

    let text = format!("{} {}", title, description).to_lowercase();
    let hits = |keywords: &[&str]| -> i32 {
        keywords.iter().filter(|kw| text.contains(*kw)).count() as i32
    };

    let score = hits(MEDIUM_KEYWORDS) + 2 * hits(HARD_KEYWORDS) - hits(EASY_KEYWORDS);
    match score {
        ..=-1 => Difficulty::Easy,
        0 | 1 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}
