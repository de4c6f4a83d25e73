//! TikTok 个人主页 / 视频
//!
//! 字段优先读取页面内嵌的 rehydration 数据，失败时回退到 `data-e2e` 元素。
//! 评论与回复通过页面内的评论接口分页获取（带登录 cookie）。

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, AppResult, SubResourceError};
use crate::infrastructure::{js_str, PageDriver};
use crate::models::{PlatformId, Record};
use crate::platforms::{resolve_handle, Platform};
use crate::services::{
    paginate, Comment, FieldExtractor, FieldSpec, LinkPattern, LoginSpec, PageChunk, Readiness,
    Reply, ThreadSource,
};
use crate::workflow::SessionContext;

const COMMENT_API: &str = "https://www.tiktok.com/api/comment/list/";
const REPLY_API: &str = "https://www.tiktok.com/api/comment/list/reply/";
/// 接口单页上限
const PAGE_SIZE: usize = 50;

/// 页面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Profile,
    Video,
}

impl PageKind {
    pub fn of(url: &str) -> Self {
        if url.contains("/video/") {
            PageKind::Video
        } else {
            PageKind::Profile
        }
    }
}

/// 从内嵌数据中读取某个路径
fn rehydration(scope: &str, path: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.getElementById('__UNIVERSAL_DATA_FOR_REHYDRATION__');
            if (!el) return null;
            const data = JSON.parse(el.textContent).__DEFAULT_SCOPE__ || {{}};
            const root = data['{scope}'];
            return root?.{path} ?? null;
        }})()"#
    )
}

fn user_detail(path: &str) -> String {
    rehydration("webapp.user-detail", &format!("userInfo?.{}", path))
}

fn video_detail(path: &str) -> String {
    rehydration("webapp.video-detail", &format!("itemInfo?.itemStruct?.{}", path))
}

/// 视频 ID
pub fn video_id(url: &str) -> Option<String> {
    Regex::new(r"/video/(\d+)")
        .ok()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// TikTok
pub struct TikTok;

impl TikTok {
    fn profile_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("username")
                .script(user_detail("user?.uniqueId"))
                .text("[data-e2e='user-title']"),
            FieldSpec::new("nickname")
                .script(user_detail("user?.nickname"))
                .text("[data-e2e='user-subtitle']"),
            FieldSpec::new("followers")
                .script(user_detail("stats?.followerCount"))
                .text("[data-e2e='followers-count']"),
            FieldSpec::new("following")
                .script(user_detail("stats?.followingCount"))
                .text("[data-e2e='following-count']"),
            FieldSpec::new("likes")
                .script(user_detail("stats?.heartCount"))
                .text("[data-e2e='likes-count']"),
            FieldSpec::new("bio")
                .script(user_detail("user?.signature"))
                .text("[data-e2e='user-bio']"),
            FieldSpec::new("video_count").script(user_detail("stats?.videoCount")),
        ]
    }

    fn video_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("description")
                .script(video_detail("desc"))
                .text("[data-e2e='browse-video-desc'], [data-e2e='video-desc']"),
            FieldSpec::new("likes_count")
                .script(video_detail("stats?.diggCount"))
                .text("[data-e2e='like-count'], [data-e2e='browse-like-count']"),
            FieldSpec::new("comments_count")
                .script(video_detail("stats?.commentCount"))
                .text("[data-e2e='comment-count'], [data-e2e='browse-comment-count']"),
            FieldSpec::new("shares_count")
                .script(video_detail("stats?.shareCount"))
                .text("[data-e2e='share-count']"),
            FieldSpec::new("music")
                .script(video_detail("music?.title"))
                .text("[data-e2e='browse-music'], [data-e2e='video-music']"),
            FieldSpec::new("created").script(video_detail("createTime")),
        ]
    }

    async fn extract_video(&self, page: &dyn PageDriver, record: &mut Record) {
        let link = record.link().map(str::to_string);
        record.set_field("id", link.as_deref().and_then(video_id));
        record.set_field("video_url", link);
        FieldExtractor::new(page)
            .extract_into(&self.video_fields(), record)
            .await;
        let hashtags = hashtags(page).await;
        record.set_list("hashtags", hashtags.into_iter().map(JsonValue::String).collect());
    }

    async fn attach_comments(&self, page: &dyn PageDriver, record: &mut Record, ctx: &SessionContext) {
        let Some(video_id) = record.field("id").map(str::to_string) else {
            debug!("{} 视频 ID 缺失，跳过评论", ctx);
            record.set_list("comments", Vec::new());
            return;
        };
        let thread = TikTokThread { page, video_id };
        let comments = ctx.sub_resources().fetch(&thread).await;
        record.set_list("comments", comments);
    }

    /// 个人主页：收集视频链接后逐个打开，在同一页面中依次抓取
    async fn collect_videos(
        &self,
        page: &dyn PageDriver,
        ctx: &SessionContext,
    ) -> AppResult<Vec<JsonValue>> {
        let outcome = ctx
            .discovery_engine()
            .discover(page, &self.link_pattern()?, ctx.config.video_count)
            .await?;
        let mut links = outcome.locators;
        links.sort();

        let navigator = ctx.navigator();
        let mut videos = Vec::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            info!("{} 🎬 视频 {}/{}: {}", ctx, i + 1, links.len(), link);
            if let Err(e) = navigator.open(page, link, self.readiness()).await {
                warn!("{} ⚠️ 跳过视频 {}: {}", ctx, link, e);
                continue;
            }
            let mut video = Record::new(link.as_str());
            self.extract_video(page, &mut video).await;
            self.attach_comments(page, &mut video, ctx).await;
            videos.push(video.into_value());
        }
        Ok(videos)
    }
}

#[async_trait]
impl Platform for TikTok {
    fn id(&self) -> PlatformId {
        PlatformId::TikTok
    }

    fn login_spec(&self) -> AppResult<LoginSpec> {
        Ok(LoginSpec {
            platform: self.id(),
            login_url: "https://www.tiktok.com/login/phone-or-email/email",
            form_ready: None,
            // 账号由操作者在打开的登录页中手动输入
            fields: Vec::new(),
            submit: None,
            success_url: Regex::new(r"^https://www\.tiktok\.com/(?:foryou|$|\?)")?,
            manual_wait: Some(Duration::from_secs(60)),
        })
    }

    fn readiness(&self) -> Readiness<'static> {
        Readiness {
            marker: "#__UNIVERSAL_DATA_FOR_REHYDRATION__, [data-e2e='user-page'], [data-e2e='browse-video-desc'], [data-e2e='video-desc']",
            dismiss: None,
        }
    }

    fn resolve_locator(&self, locator: &str) -> AppResult<String> {
        Ok(resolve_handle(locator, "tiktok.com", |h| {
            format!("https://www.tiktok.com/@{}", h)
        }))
    }

    fn fields(&self) -> AppResult<Vec<FieldSpec>> {
        Ok(self.profile_fields())
    }

    fn supports_discovery(&self) -> bool {
        true
    }

    fn link_pattern(&self) -> AppResult<LinkPattern> {
        LinkPattern::new("a[href*='/video/']", r"/@[\w.-]+/video/\d+")
    }

    async fn extract_fields(
        &self,
        page: &dyn PageDriver,
        record: &mut Record,
        _ctx: &SessionContext,
    ) -> AppResult<()> {
        match record.link().map(PageKind::of) {
            Some(PageKind::Video) => self.extract_video(page, record).await,
            _ => {
                FieldExtractor::new(page)
                    .extract_into(&self.profile_fields(), record)
                    .await
            }
        }
        Ok(())
    }

    async fn fetch_sub_resources(
        &self,
        page: &dyn PageDriver,
        record: &mut Record,
        ctx: &SessionContext,
    ) -> AppResult<()> {
        match record.link().map(PageKind::of) {
            Some(PageKind::Video) => self.attach_comments(page, record, ctx).await,
            _ => {
                let videos = match self.collect_videos(page, ctx).await {
                    Ok(videos) => videos,
                    Err(e) => {
                        warn!("{} ⚠️ 视频列表获取失败: {}", ctx, e);
                        Vec::new()
                    }
                };
                record.set_list("videos", videos);
            }
        }
        Ok(())
    }
}

async fn hashtags(page: &dyn PageDriver) -> Vec<String> {
    let script = video_detail("textExtra?.filter(t => t.type === 1).map(t => t.hashtagName)");
    if let Ok(JsonValue::Array(tags)) = page.eval(&script).await {
        let tags: Vec<String> = tags
            .into_iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            return tags;
        }
    }
    page.inner_texts("a[href*='/tag/']")
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

// ========== 评论接口 ==========

#[derive(Debug, Deserialize)]
struct ApiPage {
    status_code: Option<i64>,
    status_msg: Option<String>,
    comments: Option<Vec<ApiComment>>,
    cursor: Option<JsonValue>,
    has_more: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    cid: Option<String>,
    text: Option<String>,
    digg_count: Option<u64>,
    create_time: Option<i64>,
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    unique_id: Option<String>,
}

impl From<ApiComment> for Comment {
    fn from(c: ApiComment) -> Self {
        Comment {
            id: c.cid,
            user: c.user.and_then(|u| u.unique_id),
            text: c.text,
            likes: c.digg_count,
            timestamp: c.create_time,
        }
    }
}

impl From<ApiComment> for Reply {
    fn from(c: ApiComment) -> Self {
        Reply {
            user: c.user.and_then(|u| u.unique_id),
            text: c.text,
            likes: c.digg_count,
            timestamp: c.create_time,
        }
    }
}

fn truthy(value: &JsonValue) -> bool {
    value
        .as_bool()
        .or_else(|| value.as_i64().map(|n| n != 0))
        .unwrap_or(false)
}

/// 解析评论接口的一页
fn parse_api_page<T: From<ApiComment>>(payload: JsonValue, resource: &str) -> AppResult<PageChunk<T>> {
    if let Some(status) = payload.get("__http_status") {
        return Err(SubResourceError::BadStatus {
            resource: resource.to_string(),
            status: format!("HTTP {}", status),
        }
        .into());
    }
    if payload.is_null() {
        return Err(AppError::bad_payload(resource, "空响应"));
    }

    let page: ApiPage = serde_json::from_value(payload)
        .map_err(|e| AppError::bad_payload(resource, e.to_string()))?;

    if let Some(code) = page.status_code.filter(|c| *c != 0) {
        return Err(SubResourceError::BadStatus {
            resource: resource.to_string(),
            status: format!("{} {}", code, page.status_msg.unwrap_or_default()),
        }
        .into());
    }

    let items: Vec<T> = page
        .comments
        .unwrap_or_default()
        .into_iter()
        .map(T::from)
        .collect();
    let next = if page.has_more.as_ref().is_some_and(truthy) {
        page.cursor.map(|c| match c {
            JsonValue::String(s) => s,
            other => other.to_string(),
        })
    } else {
        None
    };
    Ok(PageChunk { items, next })
}

/// 某个视频的评论线程
struct TikTokThread<'a> {
    page: &'a dyn PageDriver,
    video_id: String,
}

impl TikTokThread<'_> {
    async fn fetch_json(&self, url: &Url) -> AppResult<JsonValue> {
        let js_code = format!(
            r#"(async () => {{
                const response = await fetch({}, {{
                    method: 'GET',
                    headers: {{ 'Accept': 'application/json, text/plain, */*' }},
                    credentials: 'include',
                }});
                if (!response.ok) return {{ __http_status: response.status }};
                return await response.json();
            }})()"#,
            js_str(url.as_str())?
        );
        self.page.eval(&js_code).await
    }

    async fn comment_page(&self, cursor: Option<String>, cap: usize) -> AppResult<PageChunk<Comment>> {
        let count = cap.clamp(1, PAGE_SIZE).to_string();
        let cursor = cursor.unwrap_or_else(|| "0".to_string());
        let url = Url::parse_with_params(
            COMMENT_API,
            &[
                ("aid", "1988"),
                ("aweme_id", self.video_id.as_str()),
                ("count", count.as_str()),
                ("cursor", cursor.as_str()),
            ],
        )?;
        parse_api_page(self.fetch_json(&url).await?, "comments")
    }

    async fn reply_page(
        &self,
        comment_id: &str,
        cursor: Option<String>,
        cap: usize,
    ) -> AppResult<PageChunk<Reply>> {
        let count = cap.clamp(1, PAGE_SIZE).to_string();
        let cursor = cursor.unwrap_or_else(|| "0".to_string());
        let url = Url::parse_with_params(
            REPLY_API,
            &[
                ("aid", "1988"),
                ("item_id", self.video_id.as_str()),
                ("comment_id", comment_id),
                ("count", count.as_str()),
                ("cursor", cursor.as_str()),
            ],
        )?;
        parse_api_page(self.fetch_json(&url).await?, "replies")
    }
}

impl ThreadSource for TikTokThread<'_> {
    fn comments(&self, cap: usize) -> BoxStream<'_, AppResult<Comment>> {
        paginate(move |cursor| self.comment_page(cursor, cap))
    }

    fn replies<'a>(&'a self, comment: &'a Comment, cap: usize) -> BoxStream<'a, AppResult<Reply>> {
        match comment.id.as_deref() {
            Some(comment_id) => paginate(move |cursor| self.reply_page(comment_id, cursor, cap)),
            None => stream::empty().boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handles_resolve_to_profile_urls() {
        assert_eq!(
            TikTok.resolve_locator("@scout2015").unwrap(),
            "https://www.tiktok.com/@scout2015"
        );
        assert_eq!(
            TikTok.resolve_locator("www.tiktok.com/@scout2015/video/6718335390845095173").unwrap(),
            "https://www.tiktok.com/@scout2015/video/6718335390845095173"
        );
    }

    #[test]
    fn page_kind_and_video_id_come_from_url() {
        let url = "https://www.tiktok.com/@scout2015/video/6718335390845095173";
        assert_eq!(PageKind::of(url), PageKind::Video);
        assert_eq!(video_id(url).as_deref(), Some("6718335390845095173"));
        assert_eq!(PageKind::of("https://www.tiktok.com/@scout2015"), PageKind::Profile);
    }

    #[test]
    fn api_page_maps_comments_and_cursor() {
        let payload = json!({
            "status_code": 0,
            "cursor": 20,
            "has_more": 1,
            "comments": [{
                "cid": "7001",
                "text": "nice",
                "digg_count": 12,
                "create_time": 1700000000,
                "user": { "unique_id": "alice" }
            }]
        });
        let page: PageChunk<Comment> = parse_api_page(payload, "comments").unwrap();
        assert_eq!(page.next.as_deref(), Some("20"));
        assert_eq!(page.items[0].id.as_deref(), Some("7001"));
        assert_eq!(page.items[0].user.as_deref(), Some("alice"));
        assert_eq!(page.items[0].likes, Some(12));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let payload = json!({ "status_code": 0, "cursor": 40, "has_more": 0, "comments": null });
        let page: PageChunk<Reply> = parse_api_page(payload, "replies").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn error_status_is_a_sub_resource_error() {
        let err = parse_api_page::<Comment>(json!({ "status_code": 10201, "status_msg": "rate" }), "comments")
            .err()
            .unwrap();
        assert!(matches!(err, AppError::SubResource(_)));
        let err = parse_api_page::<Comment>(json!({ "__http_status": 403 }), "comments")
            .err()
            .unwrap();
        assert!(err.to_string().contains("403"));
    }
}
