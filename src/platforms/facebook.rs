//! Facebook 主页 / 个人资料

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::PageDriver;
use crate::models::{PlatformId, Record};
use crate::platforms::{resolve_handle, Platform};
use crate::services::field_extractor::strip_parens;
use crate::services::{Comment, FieldExtractor, FieldSpec, LoginSpec, Readiness, Reply, ThreadSource};
use crate::workflow::SessionContext;

pub(crate) const FACEBOOK_LOGIN_URL: &str = "https://www.facebook.com/login";
pub(crate) const FACEBOOK_SUCCESS_URL: &str = r"^https://(?:www|web)\.facebook\.com/(?:\?.*)?$";
pub(crate) const MAIN_MARKER: &str = "div[role='main']";
pub(crate) const LOGIN_DIALOG: &str = "div[role=\"dialog\"]";

/// Facebook 登录页（主页与活动共用）
pub(crate) fn facebook_login_spec(platform: PlatformId) -> AppResult<LoginSpec> {
    Ok(LoginSpec {
        platform,
        login_url: FACEBOOK_LOGIN_URL,
        form_ready: Some("input#email"),
        fields: vec![("input#email", "FB_EMAIL"), ("input#pass", "FB_PASSWORD")],
        submit: Some("button[name='login']"),
        success_url: Regex::new(FACEBOOK_SUCCESS_URL)?,
        manual_wait: None,
    })
}

const NAME_SCRIPT: &str = r#"(() => {
    const h1 = document.querySelector('h1');
    const node = h1 && h1.childNodes[0];
    return node ? node.textContent.trim() : null;
})()"#;

const ABOUT_SCRIPT: &str = r#"(() => {
    const heading = Array.from(document.querySelectorAll('h2'))
        .find(h => (h.innerText || '').includes('About'));
    const card = heading && heading.closest('div.html-div');
    return card ? card.innerText.trim() : null;
})()"#;

/// 给尚未处理的帖子打上编号并返回其基本信息
const COLLECT_ARTICLES_SCRIPT: &str = r#"(() => {
    const out = [];
    let next = document.querySelectorAll('[data-harvest-id]').length;
    for (const art of document.querySelectorAll("div[role='main'] div[role='article']")) {
        if (art.dataset.harvestId) continue;
        const id = next++;
        art.dataset.harvestId = String(id);
        const content = art.querySelector("div[dir='auto']");
        const abbr = art.querySelector('abbr');
        const link = art.querySelector("a[aria-hidden='true']");
        out.push({
            id,
            content: content ? content.innerText : null,
            timestamp: abbr ? abbr.getAttribute('title') : null,
            permalink: link ? link.getAttribute('href') : null,
        });
    }
    return out;
})()"#;

/// Facebook 主页
pub struct Facebook;

#[async_trait]
impl Platform for Facebook {
    fn id(&self) -> PlatformId {
        PlatformId::Facebook
    }

    fn login_spec(&self) -> AppResult<LoginSpec> {
        facebook_login_spec(self.id())
    }

    fn readiness(&self) -> Readiness<'static> {
        Readiness {
            marker: MAIN_MARKER,
            dismiss: Some(LOGIN_DIALOG),
        }
    }

    fn resolve_locator(&self, locator: &str) -> AppResult<String> {
        Ok(resolve_handle(locator, "facebook.com", |h| {
            format!("https://www.facebook.com/{}", h)
        }))
    }

    fn fields(&self) -> AppResult<Vec<FieldSpec>> {
        Ok(vec![
            FieldSpec::new("name").script(NAME_SCRIPT).text("h1"),
            FieldSpec::new("nickname")
                .text("h1 span:last-child")
                .transform(strip_parens),
            FieldSpec::new("cover_photo")
                .attr("img[data-imgperflogname='profileCoverPhoto']", "src"),
            FieldSpec::new("connections_count").pattern(
                "a[href*='/friends'], a[href*='/followers'], a[href*='/members']",
                &[
                    r"([\d.,]+[KMkm]?)\s*(?:friends|followers|members)",
                    r"(?i)^.*\b(?:friends|followers|members)\b.*$",
                ],
            )?,
            FieldSpec::new("about_raw").script(ABOUT_SCRIPT),
        ])
    }

    async fn extract_fields(
        &self,
        page: &dyn PageDriver,
        record: &mut Record,
        _ctx: &SessionContext,
    ) -> AppResult<()> {
        let extractor = FieldExtractor::new(page);
        extractor.extract_into(&self.fields()?, record).await;

        // 头像通过名字定位，需在 name 之后解析
        let profile_photo = match record.field("name") {
            Some(name) => {
                let selector = format!("svg[aria-label=\"{}\"] image", css_escape(name));
                let spec = FieldSpec::new("profile_photo")
                    .attr(selector.clone(), "xlink:href")
                    .attr(selector, "href");
                extractor.resolve(&spec).await
            }
            None => None,
        };
        record.set_field("profile_photo", profile_photo);
        Ok(())
    }

    async fn fetch_sub_resources(
        &self,
        page: &dyn PageDriver,
        record: &mut Record,
        ctx: &SessionContext,
    ) -> AppResult<()> {
        let fetcher = ctx.sub_resources();
        let settle = Duration::from_millis(ctx.config.scroll_settle_max_ms);
        let mut posts = Vec::new();

        for pass in 1..=ctx.config.post_scroll_passes {
            let batch = match collect_articles(page).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("{} ⚠️ 第 {} 轮帖子收集失败: {}", ctx, pass, e);
                    break;
                }
            };
            debug!("{} 第 {} 轮新增 {} 个帖子", ctx, pass, batch.len());

            for post in batch {
                let thread = ArticleThread { page, id: post.id };
                let comments = fetcher.fetch(&thread).await;
                posts.push(json!({
                    "content": post.content,
                    "timestamp": post.timestamp,
                    "permalink": post.permalink,
                    "comments": comments,
                }));
            }

            let height = page.scroll_height().await.unwrap_or(0);
            if let Err(e) = page.scroll_by(height as i64).await {
                debug!("滚动失败: {}", e);
            }
            sleep(settle).await;
        }

        info!("{} 📝 共收集 {} 个帖子", ctx, posts.len());
        record.set_list("posts", posts);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ArticleStub {
    id: u64,
    content: Option<String>,
    timestamp: Option<String>,
    permalink: Option<String>,
}

async fn collect_articles(page: &dyn PageDriver) -> AppResult<Vec<ArticleStub>> {
    let value = page.eval(COLLECT_ARTICLES_SCRIPT).await?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Deserialize)]
struct DomComment {
    user: Option<String>,
    text: Option<String>,
}

/// 帖子下方 DOM 中的评论（展开"See more comments"后读取）；没有回复
struct ArticleThread<'a> {
    page: &'a dyn PageDriver,
    id: u64,
}

impl ArticleThread<'_> {
    async fn load(&self, cap: usize) -> AppResult<Vec<Comment>> {
        let js_code = format!(
            r#"(async () => {{
                const art = document.querySelector('[data-harvest-id="{id}"]');
                if (!art) throw new Error('article {id} is no longer attached');
                const more = art.querySelector("div[aria-label='See more comments']");
                if (more) {{
                    more.click();
                    await new Promise(r => setTimeout(r, 1000));
                }}
                return Array.from(art.querySelectorAll("div[aria-label='Comment']"))
                    .slice(0, {cap})
                    .map(c => {{
                        const user = c.querySelector('strong');
                        const text = c.querySelector("span[dir='auto']");
                        return {{
                            user: user ? user.innerText : null,
                            text: text ? text.innerText : null,
                        }};
                    }});
            }})()"#,
            id = self.id,
            cap = cap,
        );
        let comments: Vec<DomComment> = serde_json::from_value(self.page.eval(&js_code).await?)?;
        Ok(comments
            .into_iter()
            .map(|c| Comment {
                user: c.user,
                text: c.text,
                ..Comment::default()
            })
            .collect())
    }
}

impl ThreadSource for ArticleThread<'_> {
    fn comments(&self, cap: usize) -> BoxStream<'_, AppResult<Comment>> {
        stream::once(self.load(cap))
            .map_ok(|comments| stream::iter(comments.into_iter().map(Ok::<_, AppError>)))
            .try_flatten()
            .boxed()
    }

    fn replies<'a>(&'a self, _comment: &'a Comment, _cap: usize) -> BoxStream<'a, AppResult<Reply>> {
        stream::empty().boxed()
    }
}

/// CSS 属性值转义
fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
