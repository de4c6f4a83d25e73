//! 平台层（Platforms）
//!
//! 每个平台实现同一个 [`Platform`] 接口，由 [`PlatformRegistry`] 按 [`PlatformId`] 查找。
//! 新增平台只需要实现接口并注册，不需要修改任何分发逻辑。
//!
//! 接口的默认实现直接委托给通用服务：
//!
//! ```text
//! authenticate        → AuthenticationStateMachine
//! navigate            → Navigator
//! extract_fields      → FieldExtractor
//! discover            → ScrollDiscoveryEngine
//! fetch_sub_resources → (默认无子资源)
//! ```

pub mod facebook;
pub mod facebook_event;
pub mod instagram;
pub mod tiktok;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{AppResult, ConfigError};
use crate::infrastructure::PageDriver;
use crate::models::{PlatformId, Record};
use crate::services::{
    normalize_locator, AuthOutcome, AuthenticationStateMachine, DiscoveryOutcome, FieldExtractor,
    FieldSpec, LinkPattern, LoginSpec, Readiness,
};
use crate::workflow::SessionContext;

pub use facebook::Facebook;
pub use facebook_event::FacebookEvent;
pub use instagram::Instagram;
pub use tiktok::TikTok;

/// 平台能力接口
#[async_trait]
pub trait Platform: Send + Sync {
    fn id(&self) -> PlatformId;

    /// 登录页描述
    fn login_spec(&self) -> AppResult<LoginSpec>;

    /// 页面就绪条件
    fn readiness(&self) -> Readiness<'static>;

    /// 字段声明（按输出顺序）
    fn fields(&self) -> AppResult<Vec<FieldSpec>>;

    /// 把链接或账号名解析为完整链接
    fn resolve_locator(&self, locator: &str) -> AppResult<String> {
        Ok(normalize_locator(locator))
    }

    fn supports_discovery(&self) -> bool {
        false
    }

    /// 发现模式未提供链接时使用的列表页
    fn default_listing(&self) -> Option<&'static str> {
        None
    }

    /// 发现模式的目标链接规则
    fn link_pattern(&self) -> AppResult<LinkPattern> {
        Err(ConfigError::UnsupportedMode {
            platform: self.id().to_string(),
            mode: "discovery".to_string(),
        }
        .into())
    }

    async fn authenticate(
        &self,
        page: &dyn PageDriver,
        ctx: &SessionContext,
    ) -> AppResult<AuthOutcome> {
        let spec = self.login_spec()?;
        AuthenticationStateMachine::new(&spec, ctx.auth_timings())
            .run(page, &ctx.credentials)
            .await
    }

    async fn navigate(
        &self,
        page: &dyn PageDriver,
        url: &str,
        ctx: &SessionContext,
    ) -> AppResult<()> {
        ctx.navigator().open(page, url, self.readiness()).await
    }

    async fn extract_fields(
        &self,
        page: &dyn PageDriver,
        record: &mut Record,
        _ctx: &SessionContext,
    ) -> AppResult<()> {
        let fields = self.fields()?;
        FieldExtractor::new(page).extract_into(&fields, record).await;
        Ok(())
    }

    async fn discover(
        &self,
        page: &dyn PageDriver,
        ctx: &SessionContext,
        limit: usize,
    ) -> AppResult<DiscoveryOutcome> {
        let pattern = self.link_pattern()?;
        ctx.discovery_engine().discover(page, &pattern, limit).await
    }

    async fn fetch_sub_resources(
        &self,
        _page: &dyn PageDriver,
        _record: &mut Record,
        _ctx: &SessionContext,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// 链接或账号名 → 完整链接
///
/// 包含平台域名或协议的输入视为链接（补全协议）；其余视为账号名，去掉开头的 `@`
pub(crate) fn resolve_handle(
    locator: &str,
    host: &str,
    profile_url: impl Fn(&str) -> String,
) -> String {
    let trimmed = locator.trim();
    if trimmed.contains("://") || trimmed.contains(host) || trimmed.contains('/') {
        normalize_locator(trimmed)
    } else {
        profile_url(trimmed.trim_start_matches('@'))
    }
}

/// 平台注册表
pub struct PlatformRegistry {
    platforms: HashMap<PlatformId, Box<dyn Platform>>,
}

impl PlatformRegistry {
    pub fn empty() -> Self {
        Self {
            platforms: HashMap::new(),
        }
    }

    /// 注册全部内置平台
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Facebook));
        registry.register(Box::new(FacebookEvent));
        registry.register(Box::new(Instagram));
        registry.register(Box::new(TikTok));
        registry
    }

    /// 注册平台，同 ID 的旧实现被替换
    pub fn register(&mut self, platform: Box<dyn Platform>) {
        self.platforms.insert(platform.id(), platform);
    }

    pub fn get(&self, id: PlatformId) -> AppResult<&dyn Platform> {
        self.platforms
            .get(&id)
            .map(|p| p.as_ref())
            .ok_or_else(|| ConfigError::UnsupportedPlatform(id.to_string()).into())
    }

    pub fn ids(&self) -> Vec<PlatformId> {
        let mut ids: Vec<PlatformId> = self.platforms.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_platform() {
        let registry = PlatformRegistry::with_defaults();
        for id in PlatformId::ALL {
            assert_eq!(registry.get(id).unwrap().id(), id);
        }
    }

    #[test]
    fn empty_registry_reports_unsupported_platform() {
        let registry = PlatformRegistry::empty();
        let err = registry.get(PlatformId::Instagram).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn every_platform_declares_valid_fields_and_login() {
        let registry = PlatformRegistry::with_defaults();
        for id in registry.ids() {
            let platform = registry.get(id).unwrap();
            assert!(!platform.fields().unwrap().is_empty(), "{} has no fields", id);
            let login = platform.login_spec().unwrap();
            // 没有表单字段时由操作者手动登录，此时也不需要凭据
            assert_eq!(
                login.fields.is_empty(),
                id.credential_keys().is_empty(),
                "{} login fields and credential keys disagree",
                id
            );
            if platform.supports_discovery() {
                platform.link_pattern().unwrap();
            }
        }
    }
}
