//! 测试用的脚本化浏览器
//!
//! `FakeSite` 按 URL 描述页面内容，`FakeBrowser` 为每个标签页创建一个 `FakePage`。
//! 所有调用记录在共享日志中，便于断言调用顺序。
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use social_harvest::error::{AppError, AppResult, NavigationError};
use social_harvest::models::{SessionState, StoredCookie};
use social_harvest::{BrowserSession, Config, PageDriver};

/// 单个页面的内容
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    counts: HashMap<String, usize>,
    texts: HashMap<String, Vec<String>>,
    htmls: HashMap<String, String>,
    attrs: HashMap<(String, String), Vec<Option<String>>>,
    evals: Vec<(String, JsonValue)>,
    failing: HashSet<String>,
    link_selector: Option<String>,
    /// 第 n 次滚动后可见的链接（超出时取最后一组）
    link_pages: Vec<Vec<String>>,
}

impl PageScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// 页面上存在该元素（用于就绪标记）
    pub fn marker(mut self, selector: &str) -> Self {
        self.counts.insert(selector.to_string(), 1);
        self
    }

    pub fn text(mut self, selector: &str, values: &[&str]) -> Self {
        self.texts.insert(
            selector.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub fn html(mut self, selector: &str, html: &str) -> Self {
        self.htmls.insert(selector.to_string(), html.to_string());
        self
    }

    pub fn attr(mut self, selector: &str, name: &str, values: &[Option<&str>]) -> Self {
        self.attrs.insert(
            (selector.to_string(), name.to_string()),
            values.iter().map(|v| v.map(str::to_string)).collect(),
        );
        self
    }

    /// 脚本中包含 `needle` 时返回 `value`
    pub fn eval(mut self, needle: &str, value: JsonValue) -> Self {
        self.evals.push((needle.to_string(), value));
        self
    }

    /// 查询该选择器时报错
    pub fn failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }

    pub fn links(mut self, selector: &str, pages: Vec<Vec<String>>) -> Self {
        self.link_selector = Some(selector.to_string());
        self.link_pages = pages;
        self
    }

    fn visible_links(&self, scrolls: usize) -> Vec<String> {
        if self.link_pages.is_empty() {
            return Vec::new();
        }
        let index = scrolls.min(self.link_pages.len() - 1);
        self.link_pages[index].clone()
    }

    fn check(&self, selector: &str) -> AppResult<()> {
        if self.failing.contains(selector) {
            return Err(AppError::element_action(selector, "scripted failure"));
        }
        Ok(())
    }
}

/// 按 URL 组织的站点
#[derive(Debug, Default)]
pub struct FakeSite {
    pages: HashMap<String, PageScript>,
    fallback: PageScript,
    /// 点击任意按钮后跳转到的地址（模拟登录成功）
    redirect_on_click: Option<String>,
    unreachable: HashSet<String>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, script: PageScript) -> Self {
        self.pages.insert(url.to_string(), script);
        self
    }

    /// 未登记的 URL 使用的页面
    pub fn fallback(mut self, script: PageScript) -> Self {
        self.fallback = script;
        self
    }

    pub fn redirect_on_click(mut self, url: &str) -> Self {
        self.redirect_on_click = Some(url.to_string());
        self
    }

    /// 加载直接失败的地址
    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    fn script(&self, url: &str) -> &PageScript {
        self.pages.get(url).unwrap_or(&self.fallback)
    }
}

/// 共享调用日志
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Default)]
struct PageState {
    url: String,
    scrolls: usize,
    applied: Option<SessionState>,
}

/// 脚本化页面
pub struct FakePage {
    site: Arc<FakeSite>,
    state: Mutex<PageState>,
    log: CallLog,
}

impl FakePage {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self::with_log(site, CallLog::default())
    }

    pub fn with_log(site: Arc<FakeSite>, log: CallLog) -> Self {
        Self {
            site,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                ..PageState::default()
            }),
            log,
        }
    }

    /// 直接设置当前地址（不记录 goto）
    pub fn at(self, url: &str) -> Self {
        self.state.lock().unwrap().url = url.to_string();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn with_script<T>(&self, f: impl FnOnce(&PageScript, &PageState) -> T) -> T {
        let state = self.state.lock().unwrap();
        f(self.site.script(&state.url), &state)
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> AppResult<()> {
        self.record(format!("goto {}", url));
        if self.site.unreachable.contains(url) {
            return Err(NavigationError::LoadFailed {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }
            .into());
        }
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.scrolls = 0;
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn count(&self, selector: &str) -> AppResult<usize> {
        self.with_script(|script, state| {
            script.check(selector)?;
            if script.link_selector.as_deref() == Some(selector) {
                return Ok(script.visible_links(state.scrolls).len());
            }
            Ok(script
                .counts
                .get(selector)
                .copied()
                .or_else(|| script.texts.get(selector).map(Vec::len))
                .unwrap_or(0))
        })
    }

    async fn inner_texts(&self, selector: &str) -> AppResult<Vec<String>> {
        self.with_script(|script, _| {
            script.check(selector)?;
            Ok(script.texts.get(selector).cloned().unwrap_or_default())
        })
    }

    async fn inner_html(&self, selector: &str) -> AppResult<Option<String>> {
        self.with_script(|script, _| {
            script.check(selector)?;
            Ok(script.htmls.get(selector).cloned())
        })
    }

    async fn attributes(&self, selector: &str, name: &str) -> AppResult<Vec<Option<String>>> {
        self.with_script(|script, _| {
            script.check(selector)?;
            Ok(script
                .attrs
                .get(&(selector.to_string(), name.to_string()))
                .cloned()
                .unwrap_or_default())
        })
    }

    async fn hrefs(&self, selector: &str) -> AppResult<Vec<String>> {
        self.with_script(|script, state| {
            script.check(selector)?;
            if script.link_selector.as_deref() == Some(selector) {
                Ok(script.visible_links(state.scrolls))
            } else {
                Ok(Vec::new())
            }
        })
    }

    async fn fill(&self, selector: &str, value: &str) -> AppResult<()> {
        self.record(format!("fill {} = {}", selector, value));
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.record(format!("click {}", selector));
        if let Some(target) = &self.site.redirect_on_click {
            self.state.lock().unwrap().url = target.clone();
        }
        Ok(())
    }

    async fn remove(&self, selector: &str) -> AppResult<bool> {
        self.record(format!("remove {}", selector));
        Ok(false)
    }

    async fn scroll_by(&self, _dy: i64) -> AppResult<()> {
        self.state.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn scroll_height(&self) -> AppResult<u64> {
        Ok(1000 * (self.state.lock().unwrap().scrolls as u64 + 1))
    }

    async fn eval(&self, script: &str) -> AppResult<JsonValue> {
        self.with_script(|page, _| {
            Ok(page
                .evals
                .iter()
                .find(|(needle, _)| script.contains(needle.as_str()))
                .map(|(_, value)| value.clone())
                .unwrap_or(JsonValue::Null))
        })
    }

    async fn capture_session(&self) -> AppResult<SessionState> {
        self.record("capture_session".to_string());
        Ok(SessionState {
            cookies: vec![StoredCookie {
                name: "c_user".to_string(),
                value: "1000".to_string(),
                domain: ".facebook.com".to_string(),
                path: "/".to_string(),
                expires: -1.0,
                http_only: false,
                secure: true,
                same_site: None,
            }],
            origins: Vec::new(),
        })
    }

    async fn apply_session(&self, state: &SessionState) -> AppResult<()> {
        self.record(format!("apply_session {} cookies", state.cookies.len()));
        self.state.lock().unwrap().applied = Some(state.clone());
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}

/// 脚本化浏览器
pub struct FakeBrowser {
    site: Arc<FakeSite>,
    opened: AtomicUsize,
    log: CallLog,
}

impl FakeBrowser {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            opened: AtomicUsize::new(0),
            log: CallLog::default(),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn open_page(&self) -> AppResult<Box<dyn PageDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("open_page".to_string());
        Ok(Box::new(FakePage::with_log(self.site.clone(), self.log.clone())))
    }
}

/// 输出与会话都写到临时目录的配置
pub fn test_config(dir: &Path) -> Config {
    Config {
        output_dir: dir.join("outputs"),
        session_dir: dir.join("session"),
        ..Config::default()
    }
}

/// 所有凭据都存在
pub fn all_credentials(key: &str) -> Option<String> {
    Some(format!("{}-value", key.to_lowercase()))
}

/// 没有任何凭据
pub fn no_credentials(_key: &str) -> Option<String> {
    None
}
