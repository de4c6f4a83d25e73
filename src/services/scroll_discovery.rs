//! 滚动发现服务 - 业务能力层
//!
//! 在列表页反复"收集链接 → 滚动 → 等待内容稳定"，
//! 直到收集到 `limit` 个不同的目标或达到最大轮数。
//! 返回的是一个集合：顺序不保证。

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, SettleMode};
use crate::error::AppResult;
use crate::infrastructure::PageDriver;

/// 目标链接的识别规则
#[derive(Debug, Clone)]
pub struct LinkPattern {
    /// 候选锚点的 CSS 选择器
    pub anchors: String,
    /// 只保留叶子资源（排除分类页 / 列表页）
    pub leaf: Regex,
}

impl LinkPattern {
    pub fn new(anchors: impl Into<String>, leaf: &str) -> AppResult<Self> {
        Ok(Self {
            anchors: anchors.into(),
            leaf: Regex::new(leaf)?,
        })
    }
}

/// 滚动后的等待方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// 固定等待
    Fixed(Duration),
    /// 每隔 `interval` 采样链接数量和页面高度，两次相同即继续，最多等待 `max`
    UntilStable { interval: Duration, max: Duration },
}

impl From<&Config> for SettleStrategy {
    fn from(config: &Config) -> Self {
        let max = Duration::from_millis(config.scroll_settle_max_ms);
        match config.settle_mode {
            SettleMode::Fixed => SettleStrategy::Fixed(max),
            SettleMode::Stable => SettleStrategy::UntilStable {
                interval: Duration::from_millis(config.scroll_settle_interval_ms),
                max,
            },
        }
    }
}

/// 一次发现的结果
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// 规范化后的链接，最多 `limit` 个
    pub locators: Vec<String>,
    /// 实际执行的轮数
    pub iterations: usize,
    /// 达到最大轮数时仍不足 `limit`
    pub exhausted: bool,
}

/// 滚动发现引擎
#[derive(Debug, Clone, Copy)]
pub struct ScrollDiscoveryEngine {
    max_iterations: usize,
    scroll_step: i64,
    settle: SettleStrategy,
}

impl ScrollDiscoveryEngine {
    pub fn new(max_iterations: usize, scroll_step: i64, settle: SettleStrategy) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            scroll_step,
            settle,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_scroll_iterations,
            config.scroll_step_px,
            SettleStrategy::from(config),
        )
    }

    pub async fn discover(
        &self,
        page: &dyn PageDriver,
        pattern: &LinkPattern,
        limit: usize,
    ) -> AppResult<DiscoveryOutcome> {
        let base = page
            .current_url()
            .await
            .ok()
            .and_then(|u| Url::parse(&u).ok());

        let mut seen: HashSet<String> = HashSet::new();
        let mut iterations = 0;

        while iterations < self.max_iterations && seen.len() < limit {
            iterations += 1;

            for href in page.hrefs(&pattern.anchors).await? {
                if seen.len() >= limit {
                    break;
                }
                if !pattern.leaf.is_match(&href) {
                    continue;
                }
                if let Some(link) = normalize_link(base.as_ref(), &href) {
                    seen.insert(link);
                }
            }
            debug!("第 {} 轮: 已发现 {} / {}", iterations, seen.len(), limit);

            if seen.len() >= limit || iterations == self.max_iterations {
                break;
            }
            page.scroll_by(self.scroll_step).await?;
            self.settle(page, &pattern.anchors).await;
        }

        let exhausted = seen.len() < limit;
        info!(
            "🔗 发现 {} 个目标 (轮数: {}{})",
            seen.len(),
            iterations,
            if exhausted { ", 内容已耗尽" } else { "" }
        );

        Ok(DiscoveryOutcome {
            locators: seen.into_iter().collect(),
            iterations,
            exhausted,
        })
    }

    async fn settle(&self, page: &dyn PageDriver, anchors: &str) {
        match self.settle {
            SettleStrategy::Fixed(delay) => sleep(delay).await,
            SettleStrategy::UntilStable { interval, max } => {
                let deadline = Instant::now() + max;
                let mut last = sample(page, anchors).await;
                loop {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!("等待内容稳定超时 ({:?})", max);
                        break;
                    }
                    sleep(interval.min(deadline - now)).await;
                    let current = sample(page, anchors).await;
                    if current == last {
                        break;
                    }
                    last = current;
                }
            }
        }
    }
}

async fn sample(page: &dyn PageDriver, anchors: &str) -> Option<(usize, u64)> {
    let count = page.count(anchors).await.ok()?;
    let height = page.scroll_height().await.ok()?;
    Some((count, height))
}

/// 解析相对链接并去掉查询参数与锚点
pub fn normalize_link(base: Option<&Url>, href: &str) -> Option<String> {
    let mut url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}
