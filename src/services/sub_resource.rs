//! 子资源（评论 / 回复）获取服务 - 业务能力层
//!
//! 三个相互独立的部分：
//! - [`SubResourceFetcher::fetch_attempt`]：一次完整获取，任何评论流错误都使整次尝试失败，不保留部分数据
//! - [`retry_with_backoff`]：重试驱动，两次尝试之间随机退避
//! - [`SubResourceFetcher::fetch`]：最终失败转换为一条错误记录，不向调用方抛出
//!
//! 回复失败只影响所属评论：不重试，在该评论的回复列表末尾追加一个错误标记。

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use rand::Rng;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 一条评论
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    /// 平台内部 ID，用于获取回复；不写入输出
    pub id: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub likes: Option<u64>,
    pub timestamp: Option<i64>,
}

/// 一条回复
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub user: Option<String>,
    pub text: Option<String>,
    pub likes: Option<u64>,
    pub timestamp: Option<i64>,
}

/// 评论线程来源
///
/// 两个方法都返回惰性的流；实现方可以按游标分页，也可以直接读取页面 DOM
pub trait ThreadSource: Send + Sync {
    /// 顶层评论，`cap` 为期望的最大数量
    fn comments(&self, cap: usize) -> BoxStream<'_, AppResult<Comment>>;

    /// 某条评论的回复
    fn replies<'a>(&'a self, comment: &'a Comment, cap: usize) -> BoxStream<'a, AppResult<Reply>>;
}

/// 分页结果
#[derive(Debug, Clone)]
pub struct PageChunk<T> {
    pub items: Vec<T>,
    /// 下一页游标；`None` 表示没有更多
    pub next: Option<String>,
}

/// 把"按游标取一页"的函数展开成逐条产出的流
///
/// 第一页以 `None` 为游标调用；空页或没有下一页游标时结束
pub fn paginate<'a, T, F, Fut>(fetch_page: F) -> BoxStream<'a, AppResult<T>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = AppResult<PageChunk<T>>> + Send + 'a,
{
    stream::try_unfold(
        (fetch_page, Some(None::<String>)),
        |(mut fetch_page, cursor)| async move {
            let Some(cursor) = cursor else {
                return Ok::<_, AppError>(None);
            };
            let chunk = fetch_page(cursor).await?;
            let next = if chunk.items.is_empty() {
                None
            } else {
                chunk.next.map(Some)
            };
            let items = stream::iter(chunk.items.into_iter().map(Ok::<T, AppError>));
            Ok(Some((items, (fetch_page, next))))
        },
    )
    .try_flatten()
    .boxed()
}

/// 重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        let (backoff_min, backoff_max) = config.backoff_range();
        Self {
            attempts: config.retry_attempts.max(1),
            backoff_min,
            backoff_max,
        }
    }

    /// 在 [min, max] 内均匀随机
    pub fn backoff(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = (self.backoff_max.as_millis() as u64).max(min);
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// 重试驱动：最多执行 `policy.attempts` 次，失败后随机退避再试，最后一次的错误原样返回
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => {
                if n > 1 {
                    info!("✅ {} 第 {} 次尝试成功", label, n);
                }
                return Ok(value);
            }
            Err(e) if n < attempts => {
                let delay = policy.backoff();
                warn!(
                    "⚠️ {} 第 {}/{} 次尝试失败: {}，{:?} 后重试",
                    label, n, attempts, e, delay
                );
                sleep(delay).await;
                n += 1;
            }
            Err(e) => {
                warn!("❌ {} 已尝试 {} 次仍失败: {}", label, attempts, e);
                return Err(e);
            }
        }
    }
}

/// 评论获取失败时写入结果的错误记录
pub fn comments_error_entry(err: &AppError) -> JsonValue {
    json!({ "error": format!("Failed to fetch comments after retries: {}", err) })
}

/// 回复获取失败时追加到回复列表的错误标记
pub fn reply_error_entry(err: &AppError) -> JsonValue {
    json!({ "error": format!("Reply fetch error: {}", err) })
}

fn reply_entry(reply: Reply) -> JsonValue {
    json!({
        "user": reply.user,
        "text": reply.text,
        "likes": reply.likes,
        "timestamp": reply.timestamp,
    })
}

fn comment_entry(comment: Comment, replies: Vec<JsonValue>) -> JsonValue {
    json!({
        "user": comment.user,
        "text": comment.text,
        "likes": comment.likes,
        "timestamp": comment.timestamp,
        "replies": replies,
    })
}

/// 子资源获取器
#[derive(Debug, Clone, Copy)]
pub struct SubResourceFetcher {
    policy: RetryPolicy,
    comment_cap: usize,
    reply_cap: usize,
}

impl SubResourceFetcher {
    pub fn new(policy: RetryPolicy, comment_cap: usize, reply_cap: usize) -> Self {
        Self {
            policy,
            comment_cap,
            reply_cap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RetryPolicy::from_config(config),
            config.comment_cap,
            config.reply_cap,
        )
    }

    /// 获取评论（含回复），永不失败：最终失败时返回仅含一条错误记录的列表
    pub async fn fetch(&self, source: &dyn ThreadSource) -> Vec<JsonValue> {
        match retry_with_backoff(&self.policy, "评论获取", move |_| self.fetch_attempt(source)).await {
            Ok(entries) => {
                debug!("获取到 {} 条评论", entries.len());
                entries
            }
            Err(e) => vec![comments_error_entry(&e)],
        }
    }

    /// 一次完整的获取：成功返回全部评论，任何评论流错误都丢弃已取得的部分
    pub async fn fetch_attempt(&self, source: &dyn ThreadSource) -> AppResult<Vec<JsonValue>> {
        let mut comments = source.comments(self.comment_cap).take(self.comment_cap);
        let mut entries = Vec::new();

        while let Some(comment) = comments.next().await {
            let comment = comment?;
            let replies = self.fetch_replies(source, &comment).await;
            entries.push(comment_entry(comment, replies));
        }

        Ok(entries)
    }

    /// 获取回复；出错时保留已取得的回复并追加一个错误标记
    async fn fetch_replies(&self, source: &dyn ThreadSource, comment: &Comment) -> Vec<JsonValue> {
        if self.reply_cap == 0 {
            return Vec::new();
        }

        let mut replies = source.replies(comment, self.reply_cap).take(self.reply_cap);
        let mut entries = Vec::new();

        while let Some(reply) = replies.next().await {
            match reply {
                Ok(reply) => entries.push(reply_entry(reply)),
                Err(e) => {
                    debug!("回复获取失败: {}", e);
                    entries.push(reply_error_entry(&e));
                    break;
                }
            }
        }

        entries
    }
}
