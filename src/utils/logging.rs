//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::GenerationMode;
use crate::orchestrator::SweepReport;
use crate::store::{CatalogueSummary, LedgerStats};

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 当前配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 成绩单批量生成");
    info!("🌐 API: {}", config.api_base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_requests);
    info!("⏳ 轮询间隔: {} 秒", config.poll_interval_secs);
    info!("{}", "=".repeat(60));
}

/// 记录目录刷新结果
pub fn log_catalogue_summary(mode: GenerationMode, summary: &CatalogueSummary) {
    info!(
        "📋 目录已刷新 ({}): 共 {} 个, 可生成 {} 个, 已生成 {} 个",
        mode, summary.total, summary.selectable, summary.generated
    );
    if summary.fetch_failed > 0 || summary.not_found > 0 {
        warn!(
            "⚠️ 检查失败 {} 个, 不存在 {} 个",
            summary.fetch_failed, summary.not_found
        );
    }
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 本批对象数
/// - `max_concurrent`: 最大并发数
pub fn log_batch_start(total: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始生成: {} 个对象, 并发 {}", total, max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息，格式为 "N succeeded / M failed"
pub fn log_batch_summary(succeeded: usize, failed: usize) {
    info!("\n{}", "─".repeat(60));
    if succeeded == 0 {
        warn!("⚠️ 没有启动任何任务: 0 succeeded / {} failed", failed);
    } else {
        info!("✓ 批次完成: {} succeeded / {} failed", succeeded, failed);
    }
    info!("{}", "─".repeat(60));
}

/// 记录一次轮询的结果
pub fn log_sweep_summary(report: &SweepReport) {
    if report.updated == 0 && report.failed == 0 {
        debug!("轮询: 查询 {} 个, 无变化", report.checked);
        return;
    }
    info!(
        "🔄 轮询: 查询 {} 个, 更新 {} 个, 失败 {} 个",
        report.checked, report.updated, report.failed
    );
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &LedgerStats, exported: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已完成: {}/{}", stats.completed, stats.total());
    info!("❌ 失败: {}", stats.failed);
    if stats.in_progress() > 0 {
        warn!("⏳ 仍在进行: {}", stats.in_progress());
    }
    info!("📤 已导出: {}", exported);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
