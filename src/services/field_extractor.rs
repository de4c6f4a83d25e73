//! 字段提取服务 - 业务能力层
//!
//! 每个字段声明一组按顺序尝试的提取策略：第一个得到非空结果的策略生效，
//! 全部失败时字段为 null。单个字段的失败不会影响其他字段。

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::PageDriver;
use crate::models::Record;

/// 字段值的后处理（例如去掉千位分隔符）；返回 `None` 表示丢弃
pub type Transform = fn(String) -> Option<String>;

/// 单个提取策略
#[derive(Debug, Clone)]
pub enum Strategy {
    /// 第 `nth` 个匹配元素的 innerText
    Text { selector: String, nth: usize },
    /// 第 `nth` 个匹配元素的属性
    Attr {
        selector: String,
        attr: String,
        nth: usize,
    },
    /// 第一个匹配元素的 innerHTML 去标签（图片替换为 alt 文本），等于 `reject` 时视为无结果
    StrippedHtml {
        selector: String,
        reject: Option<String>,
    },
    /// 按元素顺序，对每个元素的文本依次尝试正则
    Pattern {
        selector: String,
        patterns: Vec<Regex>,
    },
    /// 页面脚本，返回字符串或 null
    Script(String),
}

/// 字段声明
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    strategies: Vec<Strategy>,
    transform: Option<Transform>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
            transform: None,
        }
    }

    pub fn text(self, selector: impl Into<String>) -> Self {
        self.nth_text(selector, 0)
    }

    pub fn nth_text(mut self, selector: impl Into<String>, nth: usize) -> Self {
        self.strategies.push(Strategy::Text {
            selector: selector.into(),
            nth,
        });
        self
    }

    pub fn attr(self, selector: impl Into<String>, attr: impl Into<String>) -> Self {
        self.nth_attr(selector, attr, 0)
    }

    pub fn nth_attr(
        mut self,
        selector: impl Into<String>,
        attr: impl Into<String>,
        nth: usize,
    ) -> Self {
        self.strategies.push(Strategy::Attr {
            selector: selector.into(),
            attr: attr.into(),
            nth,
        });
        self
    }

    pub fn stripped_html(mut self, selector: impl Into<String>, reject: Option<&str>) -> Self {
        self.strategies.push(Strategy::StrippedHtml {
            selector: selector.into(),
            reject: reject.map(str::to_string),
        });
        self
    }

    /// 正则列表，按顺序尝试；有捕获组时取第 1 组
    pub fn pattern(mut self, selector: impl Into<String>, patterns: &[&str]) -> AppResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        self.strategies.push(Strategy::Pattern {
            selector: selector.into(),
            patterns,
        });
        Ok(self)
    }

    pub fn script(mut self, js: impl Into<String>) -> Self {
        self.strategies.push(Strategy::Script(js.into()));
        self
    }

    pub fn transform(mut self, f: Transform) -> Self {
        self.transform = Some(f);
        self
    }
}

/// 字段提取器
pub struct FieldExtractor<'a> {
    page: &'a dyn PageDriver,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(page: &'a dyn PageDriver) -> Self {
        Self { page }
    }

    /// 解析单个字段：第一个成功的策略生效，否则 `None`
    pub async fn resolve(&self, field: &FieldSpec) -> Option<String> {
        for (index, strategy) in field.strategies.iter().enumerate() {
            match self.apply(strategy).await {
                Ok(Some(raw)) => {
                    if let Some(value) = finish(raw, field.transform) {
                        debug!("字段 {} 由策略 #{} 提取", field.name, index + 1);
                        return Some(value);
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("字段 {} 策略 #{} 失败: {}", field.name, index + 1, e),
            }
        }
        debug!("字段 {} 无结果，置为 null", field.name);
        None
    }

    /// 依次解析所有字段写入记录；每个声明的字段都会出现在记录中
    pub async fn extract_into(&self, fields: &[FieldSpec], record: &mut Record) {
        for field in fields {
            let value = self.resolve(field).await;
            record.set_field(&field.name, value);
        }
    }

    async fn apply(&self, strategy: &Strategy) -> AppResult<Option<String>> {
        match strategy {
            Strategy::Text { selector, nth } => {
                Ok(self.page.inner_texts(selector).await?.into_iter().nth(*nth))
            }
            Strategy::Attr {
                selector,
                attr,
                nth,
            } => Ok(self
                .page
                .attributes(selector, attr)
                .await?
                .into_iter()
                .nth(*nth)
                .flatten()),
            Strategy::StrippedHtml { selector, reject } => {
                let Some(html) = self.page.inner_html(selector).await? else {
                    return Ok(None);
                };
                let text = strip_markup(&html)?;
                let rejected = reject
                    .as_deref()
                    .is_some_and(|r| text.trim().eq_ignore_ascii_case(r));
                Ok((!rejected).then_some(text))
            }
            Strategy::Pattern { selector, patterns } => {
                let texts = self.page.inner_texts(selector).await?;
                Ok(texts.iter().find_map(|t| match_patterns(t, patterns)))
            }
            Strategy::Script(js) => Ok(json_to_text(self.page.eval(js).await?)),
        }
    }
}

fn finish(raw: String, transform: Option<Transform>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = match transform {
        Some(f) => f(trimmed.to_string())?,
        None => trimmed.to_string(),
    };
    (!value.trim().is_empty()).then_some(value)
}

/// 第一个匹配的正则生效；有捕获组时返回第 1 组，否则返回整个匹配
pub fn match_patterns(text: &str, patterns: &[Regex]) -> Option<String> {
    let text = text.trim();
    patterns.iter().find_map(|re| {
        re.captures(text).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
        })
    })
}

/// 去掉 HTML 标签，图片替换为其 alt 文本（emoji 等内联图标）
pub fn strip_markup(html: &str) -> AppResult<String> {
    let img = Regex::new(r#"<img [^>]*alt="([^"]+)"[^>]*>"#)?;
    let tag = Regex::new(r"<[^>]+>")?;

    let with_alt = img.replace_all(html, "$1");
    let text = tag.replace_all(&with_alt, "");
    Ok(decode_entities(text.trim()))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// 脚本返回值转为字段文本
pub fn json_to_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 常用变换：去掉千位分隔符
pub fn strip_commas(value: String) -> Option<String> {
    Some(value.replace(',', ""))
}

/// 常用变换：去掉外层括号与不换行空格（"(昵称)" → "昵称"）
pub fn strip_parens(value: String) -> Option<String> {
    let trimmed = value.trim_matches(|c| matches!(c, '(' | ')' | '\u{a0}' | ' '));
    Some(trimmed.to_string())
}
