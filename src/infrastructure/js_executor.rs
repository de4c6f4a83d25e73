//! JS 执行器 - 基础设施层
//!
//! 持有 chromiumoxide 的 Page，把 `PageDriver` 的每个能力翻译成一次 `evaluate` 或 CDP 调用

use std::sync::Mutex;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, BrowserError, NavigationError};
use crate::infrastructure::PageDriver;
use crate::models::{OriginStorage, SessionState, StorageItem, StoredCookie};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 及基于 eval 的 DOM 查询能力
/// - 不认识任何平台 / 字段
pub struct JsExecutor {
    page: Page,
    /// 已应用的会话；每次导航后把匹配 origin 的 localStorage 写回页面
    session: Mutex<Option<SessionState>>,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self {
            page,
            session: Mutex::new(None),
        }
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: &str) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    async fn restore_local_storage(&self) -> AppResult<()> {
        let pending = match self.session.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(state) = pending else {
            return Ok(());
        };
        if state.origins.is_empty() {
            return Ok(());
        }

        let origin: String = self.eval_as("location.origin").await?;
        if let Some(storage) = state.origin(&origin) {
            let items = serde_json::to_string(&storage.local_storage)?;
            let js_code = format!(
                r#"(() => {{
                    const items = {items};
                    for (const it of items) {{ localStorage.setItem(it.name, it.value); }}
                    return items.length;
                }})()"#
            );
            let restored = self.eval(&js_code).await?;
            debug!("已恢复 {} 的 localStorage: {} 项", origin, restored);
        }
        Ok(())
    }
}

/// 把值安全地嵌入 JS 代码
pub fn js_str(value: &str) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_cookie_param(cookie: &StoredCookie) -> AppResult<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);

    if cookie.expires > 0.0 {
        builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
    }
    if let Some(same_site) = &cookie.same_site {
        if let Ok(parsed) =
            serde_json::from_value::<CookieSameSite>(JsonValue::String(same_site.clone()))
        {
            builder = builder.same_site(parsed);
        }
    }

    builder
        .build()
        .map_err(|e| AppError::Browser(BrowserError::SessionApplyFailed(e)))
}

#[async_trait]
impl PageDriver for JsExecutor {
    async fn goto(&self, url: &str) -> AppResult<()> {
        self.page.goto(url).await.map_err(|e| NavigationError::LoadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if let Err(e) = self.restore_local_storage().await {
            warn!("恢复 localStorage 失败: {}", e);
        }
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> AppResult<usize> {
        let js_code = format!("document.querySelectorAll({}).length", js_str(selector)?);
        self.eval_as(&js_code).await
    }

    async fn inner_texts(&self, selector: &str) -> AppResult<Vec<String>> {
        let js_code = format!(
            "Array.from(document.querySelectorAll({})).map(e => (e.innerText || '').trim())",
            js_str(selector)?
        );
        self.eval_as(&js_code).await
    }

    async fn inner_html(&self, selector: &str) -> AppResult<Option<String>> {
        let js_code = format!(
            "(() => {{ const e = document.querySelector({}); return e ? e.innerHTML : null; }})()",
            js_str(selector)?
        );
        self.eval_as(&js_code).await
    }

    async fn attributes(&self, selector: &str, name: &str) -> AppResult<Vec<Option<String>>> {
        let js_code = format!(
            "Array.from(document.querySelectorAll({})).map(e => e.getAttribute({}))",
            js_str(selector)?,
            js_str(name)?
        );
        self.eval_as(&js_code).await
    }

    async fn hrefs(&self, selector: &str) -> AppResult<Vec<String>> {
        let js_code = format!(
            "Array.from(document.querySelectorAll({})).map(e => e.href).filter(h => typeof h === 'string' && h.length > 0)",
            js_str(selector)?
        );
        self.eval_as(&js_code).await
    }

    async fn fill(&self, selector: &str, value: &str) -> AppResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| AppError::element_action(selector, e.to_string()))?;
        element.click().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| AppError::element_action(selector, e.to_string()))?
            .click()
            .await?;
        Ok(())
    }

    async fn remove(&self, selector: &str) -> AppResult<bool> {
        let js_code = format!(
            "(() => {{ const e = document.querySelector({}); if (e) {{ e.remove(); return true; }} return false; }})()",
            js_str(selector)?
        );
        self.eval_as(&js_code).await
    }

    async fn scroll_by(&self, dy: i64) -> AppResult<()> {
        self.eval(&format!("window.scrollBy(0, {dy}); null")).await?;
        Ok(())
    }

    async fn scroll_height(&self) -> AppResult<u64> {
        self.eval_as("document.body ? document.body.scrollHeight : 0")
            .await
    }

    async fn eval(&self, script: &str) -> AppResult<JsonValue> {
        let result = self.page.evaluate(script.to_string()).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn capture_session(&self) -> AppResult<SessionState> {
        let cookies = self
            .page
            .get_cookies()
            .await?
            .into_iter()
            .map(|c| StoredCookie {
                same_site: c
                    .same_site
                    .as_ref()
                    .and_then(|s| serde_json::to_value(s).ok())
                    .and_then(|v| v.as_str().map(str::to_string)),
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: c.expires,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        let storage: JsonValue = self
            .eval("({ origin: location.origin, items: Object.entries(localStorage) })")
            .await
            .unwrap_or(JsonValue::Null);
        let origins = match (
            storage.get("origin").and_then(JsonValue::as_str),
            storage.get("items").and_then(JsonValue::as_array),
        ) {
            (Some(origin), Some(items)) if !items.is_empty() => vec![OriginStorage {
                origin: origin.to_string(),
                local_storage: items
                    .iter()
                    .filter_map(|pair| {
                        Some(StorageItem {
                            name: pair.get(0)?.as_str()?.to_string(),
                            value: pair.get(1)?.as_str()?.to_string(),
                        })
                    })
                    .collect(),
            }],
            _ => Vec::new(),
        };

        Ok(SessionState { cookies, origins })
    }

    async fn apply_session(&self, state: &SessionState) -> AppResult<()> {
        let params = state
            .cookies
            .iter()
            .map(to_cookie_param)
            .collect::<AppResult<Vec<_>>>()?;
        if !params.is_empty() {
            self.page.set_cookies(params).await?;
        }
        debug!("已应用会话: {} 个 cookie", state.cookies.len());

        if let Ok(mut guard) = self.session.lock() {
            *guard = Some(state.clone());
        }
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}
