//! 有上限的轮询等待

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::AppResult;

/// 反复执行 `probe` 直到返回 `true` 或超时
///
/// 探测出错视为"尚未就绪"（页面加载过程中脚本执行失败很常见）。
/// 返回是否在超时前满足条件。
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match probe().await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => debug!("轮询探测失败，继续等待: {}", e),
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn returns_true_once_probe_succeeds() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let ok = poll_until(Duration::from_secs(10), Duration::from_millis(500), move || async move {
            Ok::<_, AppError>(calls.fetch_add(1, Ordering::SeqCst) >= 2)
        })
        .await;
        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline() {
        let start = Instant::now();
        let ok = poll_until(Duration::from_secs(3), Duration::from_millis(500), || async {
            Ok::<_, AppError>(false)
        })
        .await;
        assert!(!ok);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
