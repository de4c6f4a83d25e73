//! 页面导航服务 - 业务能力层
//!
//! 负责：链接规范化、加载页面、移除遮挡弹窗、等待就绪标记。
//! 不负责：判断会话是否有效（由调用方根据导航结果决定）。

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{AppError, AppResult, NavigationError};
use crate::infrastructure::PageDriver;
use crate::services::wait::poll_until;

/// 为没有协议的链接补上 `https://`
///
/// ```
/// use social_harvest::services::navigator::normalize_locator;
/// assert_eq!(normalize_locator("facebook.com/x"), "https://facebook.com/x");
/// assert_eq!(normalize_locator("http://a.b/"), "http://a.b/");
/// ```
pub fn normalize_locator(locator: &str) -> String {
    let trimmed = locator.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("https://{}", trimmed)
    }
}

/// 页面就绪条件
#[derive(Debug, Clone, Copy)]
pub struct Readiness<'a> {
    /// 就绪标记（页面主体容器）
    pub marker: &'a str,
    /// 在等待前移除的遮挡元素（登录弹窗等）
    pub dismiss: Option<&'a str>,
}

/// 导航服务
#[derive(Debug, Clone, Copy)]
pub struct Navigator {
    timeout: Duration,
    interval: Duration,
}

impl Navigator {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// 加载页面并等待就绪标记出现
    ///
    /// 超时返回 [`NavigationError::ReadinessTimeout`]
    pub async fn open(
        &self,
        page: &dyn PageDriver,
        url: &str,
        readiness: Readiness<'_>,
    ) -> AppResult<()> {
        info!("🌐 打开页面: {}", url);
        page.goto(url).await.map_err(|e| match e {
            AppError::Navigation(_) => e,
            other => AppError::Navigation(NavigationError::LoadFailed {
                url: url.to_string(),
                reason: other.to_string(),
            }),
        })?;

        if let Some(dismiss) = readiness.dismiss {
            match page.remove(dismiss).await {
                Ok(true) => debug!("已移除遮挡元素: {}", dismiss),
                Ok(false) => {}
                Err(e) => debug!("移除遮挡元素失败 (忽略): {}", e),
            }
        }

        let marker = readiness.marker;
        let ready = poll_until(self.timeout, self.interval, move || async move {
            Ok::<_, AppError>(page.count(marker).await? > 0)
        })
        .await;

        if !ready {
            return Err(NavigationError::ReadinessTimeout {
                url: url.to_string(),
                marker: marker.to_string(),
                waited: self.timeout,
            }
            .into());
        }

        debug!("页面已就绪: {}", url);
        Ok(())
    }
}
