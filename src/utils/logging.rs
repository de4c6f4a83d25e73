/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 默认 `info` 级别，`RUST_LOG` 优先；`verbose` 时提升到 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `headless`: 是否无头模式
/// - `output_dir`: 输出目录
pub fn log_startup(headless: bool, output_dir: &Path) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 社交平台数据抓取");
    info!("🖥️ 无头模式: {}", headless);
    info!("📁 输出目录: {}", output_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录任务开始信息
///
/// # 参数
/// - `platform`: 平台名称
/// - `mode`: 抓取模式
/// - `locator`: 目标链接（发现模式可为空）
/// - `limit`: 发现数量上限
pub fn log_target_start(platform: &str, mode: &str, locator: Option<&str>, limit: usize) {
    info!("\n{}", "─".repeat(60));
    info!("📦 平台: {} | 模式: {}", platform, mode);
    match locator {
        Some(locator) => info!("🔗 目标: {}", truncate_text(locator, 100)),
        None => info!("🔗 目标: 平台默认列表页"),
    }
    if mode == "discovery" {
        info!("🔢 数量上限: {}", limit);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `scraped`: 成功抓取数量
/// - `skipped`: 被跳过的目标及原因
/// - `stale_session`: 会话是否可能已失效
/// - `output`: 输出文件路径
pub fn print_final_stats(
    scraped: usize,
    skipped: &[(&str, &str)],
    stale_session: bool,
    output: Option<&Path>,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 抓取完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", scraped, scraped + skipped.len());
    info!("❌ 跳过: {}", skipped.len());
    for (locator, reason) in skipped {
        info!("   - {}: {}", truncate_text(locator, 80), truncate_text(reason, 120));
    }
    if stale_session {
        info!("⚠️ 会话可能已失效");
    }
    info!("{}", "=".repeat(60));
    if let Some(path) = output {
        info!("\n结果已保存至: {}", path.display());
    }
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
