use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value as JsonValue;
use tokio::time::Instant;

use social_harvest::error::{AppError, AppResult};
use social_harvest::services::{
    paginate, Comment, PageChunk, Reply, RetryPolicy, SubResourceFetcher, ThreadSource,
};

/// 一次评论获取的表现
#[derive(Clone, Copy)]
enum Attempt {
    /// 产出 n 条评论
    Yields(usize),
    /// 产出 k 条评论后报错
    FailsAfter(usize),
}

/// 按脚本产出评论的来源，记录评论流被打开的次数
struct ScriptedThread {
    attempts: Vec<Attempt>,
    opened: AtomicUsize,
    /// 评论 id → 回复表现
    replies: HashMap<String, Attempt>,
}

impl ScriptedThread {
    fn new(attempts: Vec<Attempt>) -> Self {
        Self {
            attempts,
            opened: AtomicUsize::new(0),
            replies: HashMap::new(),
        }
    }

    fn with_replies(mut self, comment_id: &str, plan: Attempt) -> Self {
        self.replies.insert(comment_id.to_string(), plan);
        self
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

fn comment(n: usize) -> Comment {
    Comment {
        id: Some(format!("c{}", n)),
        user: Some(format!("user{}", n)),
        text: Some(format!("comment {}", n)),
        likes: Some(n as u64),
        timestamp: Some(1_700_000_000 + n as i64),
    }
}

fn reply(n: usize) -> Reply {
    Reply {
        user: Some(format!("replier{}", n)),
        text: Some(format!("reply {}", n)),
        likes: None,
        timestamp: None,
    }
}

fn scripted<T: Send + 'static>(
    plan: Attempt,
    make: fn(usize) -> T,
) -> BoxStream<'static, AppResult<T>> {
    let items: Vec<AppResult<T>> = match plan {
        Attempt::Yields(n) => (1..=n).map(|i| Ok(make(i))).collect(),
        Attempt::FailsAfter(k) => (1..=k)
            .map(|i| Ok(make(i)))
            .chain(std::iter::once(Err(AppError::bad_payload(
                "comments",
                "connection reset",
            ))))
            .collect(),
    };
    stream::iter(items).boxed()
}

impl ThreadSource for ScriptedThread {
    fn comments(&self, _cap: usize) -> BoxStream<'_, AppResult<Comment>> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .attempts
            .get(n)
            .or_else(|| self.attempts.last())
            .copied()
            .unwrap_or(Attempt::Yields(0));
        scripted(plan, comment)
    }

    fn replies<'a>(&'a self, comment: &'a Comment, _cap: usize) -> BoxStream<'a, AppResult<Reply>> {
        let plan = comment
            .id
            .as_ref()
            .and_then(|id| self.replies.get(id))
            .copied()
            .unwrap_or(Attempt::Yields(0));
        scripted(plan, reply)
    }
}

/// 按游标分页的来源：第一次获取时第二页返回非零状态码
struct CursorThread {
    opened: AtomicUsize,
    pages_fetched: AtomicUsize,
}

impl CursorThread {
    fn new() -> Self {
        Self {
            opened: AtomicUsize::new(0),
            pages_fetched: AtomicUsize::new(0),
        }
    }

    async fn comment_page(&self, attempt: usize, cursor: Option<String>) -> AppResult<PageChunk<Comment>> {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
        match cursor.as_deref() {
            None => Ok(PageChunk {
                items: vec![comment(1), comment(2)],
                next: Some("2".to_string()),
            }),
            Some("2") if attempt == 0 => Err(AppError::bad_payload("comments", "status_code 10201")),
            Some(_) => Ok(PageChunk {
                items: vec![comment(3), comment(4)],
                next: None,
            }),
        }
    }
}

impl ThreadSource for CursorThread {
    fn comments(&self, _cap: usize) -> BoxStream<'_, AppResult<Comment>> {
        let attempt = self.opened.fetch_add(1, Ordering::SeqCst);
        paginate(move |cursor| self.comment_page(attempt, cursor))
    }

    fn replies<'a>(&'a self, _comment: &'a Comment, _cap: usize) -> BoxStream<'a, AppResult<Reply>> {
        stream::empty().boxed()
    }
}

fn fetcher(comment_cap: usize, reply_cap: usize) -> SubResourceFetcher {
    SubResourceFetcher::new(
        RetryPolicy {
            attempts: 3,
            backoff_min: Duration::from_secs(2),
            backoff_max: Duration::from_secs(5),
        },
        comment_cap,
        reply_cap,
    )
}

fn errors(entries: &[JsonValue]) -> Vec<&str> {
    entries
        .iter()
        .filter_map(|e| e.get("error").and_then(JsonValue::as_str))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn recovers_after_two_failed_attempts_without_partial_data() {
    let thread = ScriptedThread::new(vec![
        Attempt::FailsAfter(2),
        Attempt::FailsAfter(1),
        Attempt::Yields(4),
    ]);

    let start = Instant::now();
    let entries = fetcher(50, 3).fetch(&thread).await;
    let waited = start.elapsed();

    assert_eq!(thread.opened(), 3);
    assert_eq!(entries.len(), 4);
    assert!(errors(&entries).is_empty());
    let texts: Vec<&str> = entries.iter().map(|e| e["text"].as_str().unwrap()).collect();
    assert_eq!(texts, ["comment 1", "comment 2", "comment 3", "comment 4"]);
    // 两次退避，每次 2-5 秒
    assert!(waited >= Duration::from_secs(4) && waited <= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_leave_exactly_one_error_entry() {
    let thread = ScriptedThread::new(vec![Attempt::FailsAfter(3)]);

    let entries = fetcher(50, 3).fetch(&thread).await;

    assert_eq!(thread.opened(), 3);
    assert_eq!(entries.len(), 1);
    let message = entries[0]["error"].as_str().unwrap();
    assert!(message.starts_with("Failed to fetch comments after retries: "));
    assert!(message.contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn reply_failure_only_marks_its_own_comment() {
    let thread = ScriptedThread::new(vec![Attempt::Yields(3)])
        .with_replies("c1", Attempt::Yields(2))
        .with_replies("c2", Attempt::FailsAfter(1))
        .with_replies("c3", Attempt::Yields(1));

    let entries = fetcher(50, 3).fetch(&thread).await;

    // 回复失败不触发重试
    assert_eq!(thread.opened(), 1);
    assert_eq!(entries.len(), 3);
    assert!(errors(&entries).is_empty());

    let replies = |i: usize| entries[i]["replies"].as_array().unwrap().clone();
    assert_eq!(replies(0).len(), 2);
    assert_eq!(replies(2).len(), 1);

    let broken = replies(1);
    assert_eq!(broken.len(), 2);
    assert_eq!(broken[0]["text"], "reply 1");
    assert!(broken[1]["error"]
        .as_str()
        .unwrap()
        .starts_with("Reply fetch error: "));
}

#[tokio::test(start_paused = true)]
async fn caps_bound_comments_and_replies() {
    let thread =
        ScriptedThread::new(vec![Attempt::Yields(100)]).with_replies("c1", Attempt::Yields(10));

    let entries = fetcher(50, 3).fetch(&thread).await;

    assert_eq!(entries.len(), 50);
    assert_eq!(entries[0]["replies"].as_array().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn empty_thread_is_a_successful_attempt() {
    let thread = ScriptedThread::new(vec![Attempt::Yields(0)]);

    let entries = fetcher(50, 3).fetch(&thread).await;

    assert!(entries.is_empty());
    assert_eq!(thread.opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_second_page_discards_first_page_and_retries_from_start() {
    let thread = CursorThread::new();

    let entries = fetcher(50, 3).fetch(&thread).await;

    assert_eq!(thread.opened.load(Ordering::SeqCst), 2);
    // 第一次：第 1 页成功、第 2 页失败；第二次：两页都成功
    assert_eq!(thread.pages_fetched.load(Ordering::SeqCst), 4);
    assert!(errors(&entries).is_empty());
    let texts: Vec<&str> = entries.iter().map(|e| e["text"].as_str().unwrap()).collect();
    assert_eq!(texts, ["comment 1", "comment 2", "comment 3", "comment 4"]);
}
