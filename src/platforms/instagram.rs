//! Instagram 个人主页

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{AppResult, ConfigError};
use crate::infrastructure::PageDriver;
use crate::models::{PlatformId, Record};
use crate::platforms::Platform;
use crate::services::field_extractor::strip_commas;
use crate::services::{FieldExtractor, FieldSpec, LinkPattern, LoginSpec, Readiness};
use crate::workflow::SessionContext;

const STATS: &str = "header li span span";

const ACCEPT_COOKIES_SCRIPT: &str = r#"(() => {
    const button = Array.from(document.querySelectorAll('button'))
        .find(b => /Accept All/i.test(b.innerText || ''));
    if (!button) return false;
    button.click();
    return true;
})()"#;

/// Instagram 个人主页
pub struct Instagram;

impl Instagram {
    /// 从链接或账号名中取出用户名
    pub fn username(locator: &str) -> AppResult<String> {
        let trimmed = locator.trim();
        if !trimmed.contains("instagram.com") {
            let handle = trimmed.trim_start_matches('@');
            if !handle.is_empty() && !handle.contains('/') {
                return Ok(handle.to_string());
            }
        }
        Regex::new(r"instagram\.com/([^/?#]+)")?
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ConfigError::InvalidLocator {
                    platform: PlatformId::Instagram.to_string(),
                    locator: locator.to_string(),
                }
                .into()
            })
    }

    fn post_pattern() -> AppResult<LinkPattern> {
        LinkPattern::new("article a[href^='/']", r"/(?:p|reel|tv)/[\w-]+")
    }
}

#[async_trait]
impl Platform for Instagram {
    fn id(&self) -> PlatformId {
        PlatformId::Instagram
    }

    fn login_spec(&self) -> AppResult<LoginSpec> {
        Ok(LoginSpec {
            platform: self.id(),
            login_url: "https://www.instagram.com/accounts/login/",
            form_ready: Some("input[name='username']"),
            fields: vec![
                ("input[name='username']", "INSTAGRAM_USERNAME"),
                ("input[name='password']", "INSTAGRAM_PASSWORD"),
            ],
            submit: Some("button[type='submit']"),
            success_url: Regex::new(r"^https://www\.instagram\.com/(?:$|\?|accounts/onetap)")?,
            manual_wait: None,
        })
    }

    fn readiness(&self) -> Readiness<'static> {
        Readiness {
            marker: "header",
            dismiss: None,
        }
    }

    fn resolve_locator(&self, locator: &str) -> AppResult<String> {
        Ok(format!("https://www.instagram.com/{}/", Self::username(locator)?))
    }

    fn fields(&self) -> AppResult<Vec<FieldSpec>> {
        Ok(vec![
            FieldSpec::new("full_name").text("header section div h1"),
            FieldSpec::new("posts_count")
                .nth_text(STATS, 0)
                .transform(strip_commas),
            FieldSpec::new("followers_count")
                .nth_attr(STATS, "title", 1)
                .nth_text(STATS, 1),
            FieldSpec::new("following_count").nth_text(STATS, 2),
            FieldSpec::new("bio").text("header section div span"),
        ])
    }

    async fn extract_fields(
        &self,
        page: &dyn PageDriver,
        record: &mut Record,
        ctx: &SessionContext,
    ) -> AppResult<()> {
        let username = record.link().map(Self::username).transpose()?;
        record.set_field("username", username);

        FieldExtractor::new(page)
            .extract_into(&self.fields()?, record)
            .await;

        match page.eval(ACCEPT_COOKIES_SCRIPT).await {
            Ok(JsonValue::Bool(true)) => {
                debug!("{} 已接受 cookie 提示", ctx);
                sleep(Duration::from_secs(2)).await;
            }
            Ok(_) => {}
            Err(e) => debug!("cookie 提示处理失败 (忽略): {}", e),
        }

        let limit = ctx.config.profile_post_limit;
        let posts = match ctx
            .discovery_engine()
            .discover(page, &Self::post_pattern()?, limit)
            .await
        {
            Ok(outcome) => outcome.locators,
            Err(e) => {
                warn!("{} ⚠️ 帖子链接收集失败: {}", ctx, e);
                Vec::new()
            }
        };
        if posts.is_empty() {
            warn!("{} ⚠️ 未找到帖子，请检查登录状态或选择器", ctx);
        }
        record.set_list("recent_posts", posts.into_iter().map(JsonValue::String).collect());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_from_url_or_handle() {
        assert_eq!(
            Instagram::username("https://www.instagram.com/natgeo/?hl=en").unwrap(),
            "natgeo"
        );
        assert_eq!(Instagram::username("instagram.com/natgeo").unwrap(), "natgeo");
        assert_eq!(Instagram::username("@natgeo").unwrap(), "natgeo");
        assert!(Instagram::username("https://example.com/natgeo").is_err());
    }

    #[test]
    fn profile_url_has_trailing_slash() {
        assert_eq!(
            Instagram.resolve_locator("natgeo").unwrap(),
            "https://www.instagram.com/natgeo/"
        );
    }

    #[test]
    fn post_links_exclude_profile_tabs() {
        let pattern = Instagram::post_pattern().unwrap();
        assert!(pattern.leaf.is_match("https://www.instagram.com/p/C1a2b3/"));
        assert!(pattern.leaf.is_match("https://www.instagram.com/natgeo/reel/C1a2b3/"));
        assert!(!pattern.leaf.is_match("https://www.instagram.com/natgeo/tagged/"));
    }
}
