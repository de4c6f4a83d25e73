//! chromiumoxide 浏览器会话
//!
//! 启动无头浏览器（`headless`）或连接已开启调试端口的浏览器（`connection`），
//! 两者都产出 [`ChromeBrowser`]，对核心流程暴露 [`BrowserSession`] 能力。

pub mod connection;
pub mod headless;

use async_trait::async_trait;
use chromiumoxide::{Browser, Handler};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppResult, BrowserError};
use crate::infrastructure::{BrowserSession, JsExecutor, PageDriver};

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

/// 持有 chromiumoxide 的 Browser 及其事件循环
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    /// 连接的是外部浏览器时，结束时不关闭它
    owned: bool,
}

impl ChromeBrowser {
    /// 按配置启动或连接浏览器
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        match config.browser_debug_port {
            Some(port) => connect_to_browser(port).await,
            None => launch_headless_browser(config).await,
        }
    }

    fn new(browser: Browser, handler: Handler, owned: bool) -> Self {
        Self {
            browser,
            handler: spawn_handler(handler),
            owned,
        }
    }

    /// 关闭浏览器（外部浏览器只断开连接）
    pub async fn shutdown(mut self) {
        if self.owned {
            if let Err(e) = self.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
        debug!("浏览器会话已结束");
    }
}

#[async_trait]
impl BrowserSession for ChromeBrowser {
    async fn open_page(&self) -> AppResult<Box<dyn PageDriver>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(Box::new(e)))?;
        Ok(Box::new(JsExecutor::new(page)))
    }
}

/// 在后台处理浏览器事件
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("浏览器事件处理出错: {}", e);
            }
        }
    })
}
