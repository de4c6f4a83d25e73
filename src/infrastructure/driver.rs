//! 浏览器能力接口 - 基础设施层
//!
//! 核心流程只依赖这两个 trait，不直接接触 chromiumoxide。

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppResult;
use crate::models::SessionState;

/// 单个页面（标签页）的能力
///
/// 所有选择器均为 CSS 选择器；查询类方法在元素不存在时返回空结果而不是错误。
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 加载页面
    async fn goto(&self, url: &str) -> AppResult<()>;

    /// 当前页面地址
    async fn current_url(&self) -> AppResult<String>;

    /// 匹配选择器的元素数量
    async fn count(&self, selector: &str) -> AppResult<usize>;

    /// 所有匹配元素的 innerText（已 trim）
    async fn inner_texts(&self, selector: &str) -> AppResult<Vec<String>>;

    /// 第一个匹配元素的 innerHTML
    async fn inner_html(&self, selector: &str) -> AppResult<Option<String>>;

    /// 所有匹配元素的某个属性
    async fn attributes(&self, selector: &str, name: &str) -> AppResult<Vec<Option<String>>>;

    /// 所有匹配锚点的绝对链接（`a.href`）
    async fn hrefs(&self, selector: &str) -> AppResult<Vec<String>>;

    /// 在输入框中输入文本
    async fn fill(&self, selector: &str, value: &str) -> AppResult<()>;

    /// 点击第一个匹配元素
    async fn click(&self, selector: &str) -> AppResult<()>;

    /// 删除第一个匹配元素，返回是否删除
    async fn remove(&self, selector: &str) -> AppResult<bool>;

    /// 垂直滚动
    async fn scroll_by(&self, dy: i64) -> AppResult<()>;

    /// 文档高度
    async fn scroll_height(&self) -> AppResult<u64>;

    /// 执行平台特定的脚本，返回 JSON（`undefined` 视为 null）
    async fn eval(&self, script: &str) -> AppResult<JsonValue>;

    /// 导出当前会话（cookies + 当前 origin 的 localStorage）
    async fn capture_session(&self) -> AppResult<SessionState>;

    /// 应用已保存的会话
    async fn apply_session(&self, state: &SessionState) -> AppResult<()>;

    /// 关闭页面
    async fn close(&self) -> AppResult<()>;
}

/// 浏览器会话：负责打开新的标签页
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&self) -> AppResult<Box<dyn PageDriver>>;
}
