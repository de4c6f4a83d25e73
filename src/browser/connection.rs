use chromiumoxide::Browser;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::ChromeBrowser;
use crate::error::{AppResult, BrowserError};

/// 连接到已开启远程调试端口的浏览器
///
/// 适合需要手动完成验证码、保持可见窗口的场景
pub async fn connect_to_browser(port: u16) -> AppResult<ChromeBrowser> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            source: Box::new(e),
        }
    })?;
    debug!("浏览器连接成功");

    let session = ChromeBrowser::new(browser, handler, false);

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok(session)
}
