//! 记录抓取流程 - 流程层
//!
//! 核心职责：定义"一条记录"的完整处理流程
//!
//! 流程顺序：
//! 1. 打开新标签页 → 应用会话
//! 2. 解析链接 → 导航并等待就绪
//! 3. 字段提取 → 子资源（评论 / 帖子 / 视频）
//! 4. 关闭标签页（无论成功与否）

use tracing::{debug, info};

use crate::error::AppResult;
use crate::infrastructure::{BrowserSession, PageDriver};
use crate::models::{Record, SessionState};
use crate::platforms::Platform;
use crate::services::DiscoveryOutcome;
use crate::utils::logging::truncate_text;
use crate::workflow::SessionContext;

/// 记录抓取流程
///
/// - 编排单条记录的处理顺序
/// - 不持有任何资源（page 由本流程按需打开并关闭）
/// - 只依赖平台能力（platforms）
pub struct ScrapeFlow<'a> {
    platform: &'a dyn Platform,
    ctx: &'a SessionContext,
}

impl<'a> ScrapeFlow<'a> {
    pub fn new(platform: &'a dyn Platform, ctx: &'a SessionContext) -> Self {
        Self { platform, ctx }
    }

    /// 抓取一条记录
    pub async fn run(
        &self,
        browser: &dyn BrowserSession,
        session: &SessionState,
        locator: &str,
    ) -> AppResult<Record> {
        let page = browser.open_page().await?;
        let result = self.scrape_on(page.as_ref(), session, locator).await;
        close_quietly(page.as_ref()).await;
        result
    }

    /// 在列表页上发现目标链接
    pub async fn discover(
        &self,
        browser: &dyn BrowserSession,
        session: &SessionState,
        listing: &str,
        limit: usize,
    ) -> AppResult<DiscoveryOutcome> {
        let page = browser.open_page().await?;
        let result = self.discover_on(page.as_ref(), session, listing, limit).await;
        close_quietly(page.as_ref()).await;
        result
    }

    async fn scrape_on(
        &self,
        page: &dyn PageDriver,
        session: &SessionState,
        locator: &str,
    ) -> AppResult<Record> {
        let url = self.platform.resolve_locator(locator)?;
        info!("{} ▶ 开始抓取: {}", self.ctx, url);

        page.apply_session(session).await?;
        self.platform.navigate(page, &url, self.ctx).await?;

        let mut record = Record::new(url.as_str());
        self.platform
            .extract_fields(page, &mut record, self.ctx)
            .await?;
        self.platform
            .fetch_sub_resources(page, &mut record, self.ctx)
            .await?;

        let filled = record
            .field_names()
            .filter(|name| record.get(name).is_some_and(|v| !v.is_null()))
            .count();
        info!(
            "{} ✓ 抓取完成: {} ({} 个非空字段)",
            self.ctx,
            truncate_text(&url, 80),
            filled
        );
        Ok(record)
    }

    async fn discover_on(
        &self,
        page: &dyn PageDriver,
        session: &SessionState,
        listing: &str,
        limit: usize,
    ) -> AppResult<DiscoveryOutcome> {
        let url = self.platform.resolve_locator(listing)?;
        info!("{} 🔄 在列表页中发现目标: {}", self.ctx, url);

        page.apply_session(session).await?;
        self.platform.navigate(page, &url, self.ctx).await?;
        self.platform.discover(page, self.ctx, limit).await
    }
}

async fn close_quietly(page: &dyn PageDriver) {
    if let Err(e) = page.close().await {
        debug!("关闭页面失败 (忽略): {}", e);
    }
}
