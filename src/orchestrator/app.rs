//! 应用主流程 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次抓取任务的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **启动前检查**：目标、平台、凭据；任何一项不满足都在启动浏览器之前失败
//! 2. **资源管理**：启动 / 连接浏览器，结束时关闭
//! 3. **会话准备**：读取已保存的会话，没有时登录并保存
//! 4. **模式分发**：单个目标直接抓取；发现模式先发现再逐个抓取（顺序执行）
//! 5. **结果写入**：为每条记录加上 `scraped_at` 后追加到输出文件
//! 6. **全局统计**：成功 / 跳过数量及跳过原因

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::browser::ChromeBrowser;
use crate::config::Config;
use crate::error::{AppResult, ConfigError};
use crate::infrastructure::{BrowserSession, PageDriver};
use crate::models::{Credentials, ExtractionTarget, Freshness, Mode, Record, SessionState};
use crate::platforms::{Platform, PlatformRegistry};
use crate::services::{ResultAggregator, SessionManager};
use crate::utils::logging::{log_target_start, print_final_stats};
use crate::workflow::{ScrapeFlow, SessionContext};

/// 被跳过的目标
#[derive(Debug, Clone)]
pub struct SkippedTarget {
    pub locator: String,
    pub reason: String,
}

/// 运行统计
#[derive(Debug, Clone)]
pub struct RunStats {
    /// 发现模式下发现的目标数（单个模式为 1）
    pub discovered: usize,
    pub scraped: usize,
    pub skipped: Vec<SkippedTarget>,
    /// 本次是否刚刚登录
    pub fresh_login: bool,
    pub freshness: Freshness,
    /// 写入的输出文件（没有记录时为空）
    pub output: Option<PathBuf>,
    /// 写入后输出文件中的总条数
    pub stored_total: usize,
}

impl RunStats {
    fn new(fresh_login: bool) -> Self {
        Self {
            discovered: 0,
            scraped: 0,
            skipped: Vec::new(),
            fresh_login,
            freshness: Freshness::Fresh,
            output: None,
            stored_total: 0,
        }
    }

    /// 使用已保存的会话却导航失败：会话可能已失效
    fn note_navigation_failure(&mut self) {
        if !self.fresh_login && self.freshness == Freshness::Fresh {
            warn!("⚠️ 使用已保存的会话导航失败，会话可能已失效；删除会话文件即可重新登录");
            self.freshness = Freshness::Stale;
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    registry: PlatformRegistry,
    sessions: SessionManager,
    aggregator: ResultAggregator,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, PlatformRegistry::with_defaults())
    }

    pub fn with_registry(config: Config, registry: PlatformRegistry) -> Self {
        let sessions = SessionManager::new(config.session_dir.clone());
        let aggregator = ResultAggregator::new(config.output_dir.clone());
        Self {
            config,
            registry,
            sessions,
            aggregator,
        }
    }

    /// 启动前检查，不触碰浏览器
    ///
    /// `lookup` 用于读取凭据环境变量
    pub fn prepare(
        &self,
        target: &ExtractionTarget,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<SessionContext> {
        target.validate()?;
        let platform = self.registry.get(target.platform)?;

        if target.mode == Mode::Discovery {
            if !platform.supports_discovery() {
                return Err(ConfigError::UnsupportedMode {
                    platform: target.platform.to_string(),
                    mode: target.mode.as_str().to_string(),
                }
                .into());
            }
            if target.locator.is_none() && platform.default_listing().is_none() {
                return Err(ConfigError::InvalidLocator {
                    platform: target.platform.to_string(),
                    locator: String::new(),
                }
                .into());
            }
        }

        let credentials = Credentials::resolve(target.platform, lookup)?;
        Ok(SessionContext::new(
            target.platform,
            credentials,
            self.sessions.path_for(target.platform),
            self.config.clone(),
        ))
    }

    /// 完整运行：检查 → 启动浏览器 → 执行 → 关闭浏览器
    pub async fn run(&self, target: &ExtractionTarget) -> AppResult<RunStats> {
        let ctx = self.prepare(target, |key| std::env::var(key).ok())?;

        let browser = ChromeBrowser::from_config(&self.config).await?;
        let result = self.execute(&ctx, target, &browser).await;
        browser.shutdown().await;

        result
    }

    /// 使用给定的浏览器会话运行（检查仍在任何浏览器操作之前）
    pub async fn run_with(
        &self,
        target: &ExtractionTarget,
        lookup: impl Fn(&str) -> Option<String>,
        browser: &dyn BrowserSession,
    ) -> AppResult<RunStats> {
        let ctx = self.prepare(target, lookup)?;
        self.execute(&ctx, target, browser).await
    }

    /// 执行已通过检查的任务
    pub async fn execute(
        &self,
        ctx: &SessionContext,
        target: &ExtractionTarget,
        browser: &dyn BrowserSession,
    ) -> AppResult<RunStats> {
        let platform = self.registry.get(ctx.platform)?;
        log_target_start(
            ctx.platform.as_str(),
            target.mode.as_str(),
            target.locator.as_deref(),
            target.limit,
        );

        let (session, fresh_login) = self.ensure_session(platform, ctx, browser).await?;
        let flow = ScrapeFlow::new(platform, ctx);
        let mut stats = RunStats::new(fresh_login);

        let records = match target.mode {
            Mode::Single => {
                let locator = target.locator.as_deref().ok_or_else(|| {
                    ConfigError::InvalidLocator {
                        platform: ctx.platform.to_string(),
                        locator: String::new(),
                    }
                })?;
                stats.discovered = 1;
                match flow.run(browser, &session, locator).await {
                    Ok(record) => vec![record],
                    Err(e) => {
                        if e.is_navigation() {
                            stats.note_navigation_failure();
                        }
                        error!("{} ❌ 抓取失败: {}", ctx, e);
                        return Err(e);
                    }
                }
            }
            Mode::Discovery => {
                self.run_discovery(platform, &flow, ctx, target, browser, &session, &mut stats)
                    .await?
            }
        };

        stats.scraped = records.len();
        if !records.is_empty() {
            let stamped: Vec<Record> = records.into_iter().map(stamp).collect();
            stats.stored_total = self.aggregator.append_all(ctx.platform, stamped).await?;
            stats.output = Some(self.aggregator.path_for(ctx.platform));
        } else {
            warn!("{} ⚠️ 没有可写入的记录", ctx);
        }

        let skipped: Vec<(&str, &str)> = stats
            .skipped
            .iter()
            .map(|s| (s.locator.as_str(), s.reason.as_str()))
            .collect();
        print_final_stats(
            stats.scraped,
            &skipped,
            stats.freshness == Freshness::Stale,
            stats.output.as_deref(),
        );

        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_discovery(
        &self,
        platform: &dyn Platform,
        flow: &ScrapeFlow<'_>,
        ctx: &SessionContext,
        target: &ExtractionTarget,
        browser: &dyn BrowserSession,
        session: &SessionState,
        stats: &mut RunStats,
    ) -> AppResult<Vec<Record>> {
        let listing = target
            .locator
            .as_deref()
            .or_else(|| platform.default_listing())
            .ok_or_else(|| ConfigError::InvalidLocator {
                platform: ctx.platform.to_string(),
                locator: String::new(),
            })?;

        let outcome = match flow.discover(browser, session, listing, target.limit).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_navigation() {
                    stats.note_navigation_failure();
                }
                return Err(e);
            }
        };
        stats.discovered = outcome.locators.len();

        let total = outcome.locators.len();
        let mut records = Vec::with_capacity(total);
        for (i, locator) in outcome.locators.iter().enumerate() {
            info!("{} 📄 目标 {}/{}", ctx, i + 1, total);
            match flow.run(browser, session, locator).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("{} ❌ 跳过 {}: {}", ctx, locator, e);
                    if e.is_navigation() {
                        stats.note_navigation_failure();
                    }
                    stats.skipped.push(SkippedTarget {
                        locator: locator.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(records)
    }

    /// 读取已保存的会话；不存在时登录并保存
    ///
    /// 返回会话及是否刚刚登录
    async fn ensure_session(
        &self,
        platform: &dyn Platform,
        ctx: &SessionContext,
        browser: &dyn BrowserSession,
    ) -> AppResult<(SessionState, bool)> {
        if let Some(state) = self.sessions.load(&ctx.session_path).await? {
            return Ok((state, false));
        }

        info!("{} 🔐 未找到会话文件，开始登录", ctx);
        let page = browser.open_page().await?;
        let result = login_and_capture(platform, page.as_ref(), ctx).await;
        if let Err(e) = page.close().await {
            warn!("关闭登录页失败: {}", e);
        }

        let state = result?;
        self.sessions.save(&ctx.session_path, &state).await?;
        Ok((state, true))
    }
}

async fn login_and_capture(
    platform: &dyn Platform,
    page: &dyn PageDriver,
    ctx: &SessionContext,
) -> AppResult<SessionState> {
    let outcome = platform.authenticate(page, ctx).await?;
    info!(
        "{} 登录状态: {:?} (人工验证: {})",
        ctx, outcome.state, outcome.manual_step
    );
    page.capture_session().await
}

/// 为记录加上抓取时间
fn stamp(mut record: Record) -> Record {
    record.set_field("scraped_at", Some(chrono::Local::now().to_rfc3339()));
    record
}
