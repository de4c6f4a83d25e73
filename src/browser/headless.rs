use chromiumoxide::{Browser, BrowserConfig};
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::ChromeBrowser;
use crate::config::Config;
use crate::error::{AppResult, BrowserError};

/// 启动浏览器（默认无头模式）
pub async fn launch_headless_browser(config: &Config) -> AppResult<ChromeBrowser> {
    info!("🚀 启动浏览器 (无头模式: {})...", config.headless);

    let mut builder = BrowserConfig::builder();
    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &config.chrome_executable {
        debug!("使用浏览器: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let browser_config = builder
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--disable-blink-features=AutomationControlled",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            BrowserError::LaunchFailed(e)
        })?;

    let (browser, handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;
    debug!("浏览器启动成功");

    let session = ChromeBrowser::new(browser, handler, true);

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    info!("✅ 浏览器已就绪");
    Ok(session)
}
