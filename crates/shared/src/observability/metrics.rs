//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集。
//! 未安装 recorder 时所有记录函数都是空操作。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 安装 Prometheus recorder 并注册指标描述
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle);

    register_common_metrics(&config.service_name);
    Ok(())
}

/// 注册通用指标
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "habit_completions_total",
        "Total number of habit completion events"
    );
    metrics::describe_counter!("badge_unlocks_total", "Total number of badge unlocks");
    metrics::describe_counter!("level_ups_total", "Total number of levels gained");
    metrics::describe_counter!(
        "badge_purchases_total",
        "Total number of badge purchase attempts"
    );
    metrics::describe_histogram!("reward_xp", "Xp granted per completion event");
    metrics::describe_histogram!(
        "completion_duration_seconds",
        "Completion handling duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// 渲染当前指标快照，未安装 recorder 时返回 None
pub fn render() -> Option<String> {
    get_handle().map(|handle| handle.render())
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次打卡事件
///
/// `outcome` 取值：completed / already_completed / failed
#[inline]
pub fn record_completion(outcome: &str, xp_earned: u64, duration_secs: f64) {
    metrics::counter!("habit_completions_total", "outcome" => outcome.to_string()).increment(1);
    if outcome == "completed" {
        metrics::histogram!("reward_xp").record(xp_earned as f64);
    }
    metrics::histogram!(
        "completion_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// 记录徽章解锁
#[inline]
pub fn record_badge_unlock(badge_type: &str) {
    metrics::counter!("badge_unlocks_total", "badge_type" => badge_type.to_string()).increment(1);
}

/// 记录升级
#[inline]
pub fn record_level_ups(levels: u64) {
    if levels > 0 {
        metrics::counter!("level_ups_total").increment(levels);
    }
}

/// 记录徽章购买
///
/// `outcome` 取值：purchased / claimed / rejected
#[inline]
pub fn record_badge_purchase(outcome: &str, coins_spent: u64) {
    metrics::counter!("badge_purchases_total", "outcome" => outcome.to_string()).increment(1);
    if coins_spent > 0 {
        metrics::counter!("coins_spent_total").increment(coins_spent);
    }
}
