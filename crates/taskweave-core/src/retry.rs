//! Retry loop with optional per-attempt deadline and stop predicates

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::deadline;
use crate::delay::DelayPolicy;
use crate::error::{ConfigResult, TaskError};

/// Decides on a failed attempt, given the error and the number of retries
/// already performed (zero-based).
pub type RetryPredicate<E> = Arc<dyn Fn(&TaskError<E>, u32) -> bool + Send + Sync>;

/// Retry configuration. Every field is optional; the default retries forever
/// with no delay and no deadline.
pub struct RetryOptions<E> {
    /// Maximum number of retries after the first attempt. `None` is unbounded.
    pub retries: Option<u32>,
    /// Per-attempt deadline. A zero duration disables it.
    pub timeout: Option<Duration>,
    /// Keep retrying only while this returns `true`.
    pub retry_if: Option<RetryPredicate<E>>,
    /// Stop retrying as soon as this returns `true`.
    pub retry_until: Option<RetryPredicate<E>>,
    /// Pause before each retry, computed from the incremented retry count.
    pub delay: Option<DelayPolicy>,
}

impl<E> RetryOptions<E> {
    pub fn bounded(retries: u32) -> Self {
        Self { retries: Some(retries), ..Self::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_delay(mut self, delay: impl Into<DelayPolicy>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&TaskError<E>, u32) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    pub fn retry_until<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&TaskError<E>, u32) -> bool + Send + Sync + 'static,
    {
        self.retry_until = Some(Arc::new(predicate));
        self
    }

    fn should_stop(&self, error: &TaskError<E>, count: u32) -> Option<&'static str> {
        if self.retries.is_some_and(|max| count >= max) {
            return Some("retries exhausted");
        }
        if let Some(retry_if) = &self.retry_if {
            if !retry_if(error, count) {
                return Some("retry_if returned false");
            }
        }
        if let Some(retry_until) = &self.retry_until {
            if retry_until(error, count) {
                return Some("retry_until returned true");
            }
        }
        None
    }
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self { retries: None, timeout: None, retry_if: None, retry_until: None, delay: None }
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            retries: self.retries,
            timeout: self.timeout,
            retry_if: self.retry_if.clone(),
            retry_until: self.retry_until.clone(),
            delay: self.delay.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .field("retry_if", &self.retry_if.is_some())
            .field("retry_until", &self.retry_until.is_some())
            .field("delay", &self.delay)
            .finish()
    }
}

/// Run `task` until it succeeds or the policy says stop, returning the value
/// or the last error.
///
/// Every [`RetryOptions`] value is valid: counts and durations are unsigned
/// and a zero per-attempt timeout means no deadline. The outer result is
/// therefore always `Ok`; it matches the other entry points.
pub fn retry<F, Fut, T, E>(
    task: F,
    options: RetryOptions<E>,
) -> ConfigResult<impl Future<Output = Result<T, TaskError<E>>>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Ok(run(task, options))
}

pub(crate) async fn run<F, Fut, T, E>(task: F, options: RetryOptions<E>) -> Result<T, TaskError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let per_attempt = options.timeout.filter(|limit| !limit.is_zero());
    let mut count: u32 = 0;

    loop {
        let pending = task();
        let attempt = match per_attempt {
            Some(limit) => deadline::race(pending, limit, None).await,
            None => pending.await.map_err(TaskError::Failed),
        };
        let error = match attempt {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if let Some(reason) = options.should_stop(&error, count) {
            debug!(retries = count, reason, "giving up");
            return Err(error);
        }

        count = next_retry(count);
        debug!(retry = count, timed_out = error.is_timeout(), "retrying failed task");
        if let Some(delay) = &options.delay {
            delay.pause(count as usize).await;
        }
    }
}

/// Unbounded policies may outlive `u32::MAX` retries; the count pins there.
fn next_retry(count: u32) -> u32 {
    count.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::wait;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn counting_failure(
        calls: &Arc<AtomicU32>,
        ms: u64,
    ) -> impl Fn() -> BoxFuture<'static, Result<String, String>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                wait(Duration::from_millis(ms)).await;
                Err::<String, String>("failed".to_string())
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_on_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = retry(
            move || {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>("success") }
            },
            RetryOptions::bounded(3),
        )
        .unwrap()
        .await;
        assert_eq!(result, Ok("success"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exact_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry(counting_failure(&calls, 100), RetryOptions::bounded(3)).unwrap().await;
        assert_eq!(result, Err(TaskError::Failed("failed".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = retry(
            move || {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    wait(Duration::from_millis(100)).await;
                    if n == 10 {
                        Ok("success")
                    } else {
                        Err("failed")
                    }
                }
            },
            RetryOptions::default(),
        )
        .unwrap()
        .await;
        assert_eq!(result, Ok("success"));
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_attempt_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = RetryOptions::bounded(2).with_timeout(Duration::from_millis(50));
        let result = retry(counting_failure(&calls, 100), options).unwrap().await;
        assert_eq!(result.unwrap_err().to_string(), "timed out after 50 milliseconds");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_if_stops_at_threshold() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let options = RetryOptions::default().retry_if(move |err: &TaskError<String>, _| {
            assert_eq!(err.to_string(), "failed");
            seen.load(Ordering::SeqCst) < 5
        });
        let result = retry(counting_failure(&calls, 100), options).unwrap().await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_cap_wins_over_retry_if() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let options =
            RetryOptions::bounded(2).retry_if(move |_, _| seen.load(Ordering::SeqCst) < 5);
        let _ = retry(counting_failure(&calls, 100), options).unwrap().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let options =
            RetryOptions::bounded(10).retry_if(move |_, _| seen.load(Ordering::SeqCst) < 5);
        let _ = retry(counting_failure(&calls, 100), options).unwrap().await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let options =
            RetryOptions::default().retry_until(move |_, _| seen.load(Ordering::SeqCst) == 5);
        let _ = retry(counting_failure(&calls, 100), options).unwrap().await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_stop_conditions_combined() {
        let calls = Arc::new(AtomicU32::new(0));
        let a = calls.clone();
        let b = calls.clone();
        let options = RetryOptions::bounded(4)
            .retry_if(move |_, _| a.load(Ordering::SeqCst) < 5)
            .retry_until(move |_, _| b.load(Ordering::SeqCst) == 2);
        let _ = retry(counting_failure(&calls, 100), options).unwrap().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicates_receive_retry_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let counts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = counts.clone();
        let options = RetryOptions::bounded(3).retry_if(move |_, count| {
            record.lock().unwrap().push(count);
            true
        });
        let _ = retry(counting_failure(&calls, 10), options).unwrap().await;
        // The fourth failure exhausts the cap before the predicate runs.
        assert_eq!(*counts.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_computed_delay_uses_incremented_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = RetryOptions::bounded(2)
            .with_delay(DelayPolicy::computed(|n| Duration::from_millis(100 * n as u64)));
        let start = Instant::now();
        let _ = retry(counting_failure(&calls, 0), options).unwrap().await;
        // 100ms before the first retry, 200ms before the second.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(350));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_count_saturates() {
        assert_eq!(next_retry(0), 1);
        assert_eq!(next_retry(u32::MAX), u32::MAX);

        let unbounded: RetryOptions<String> = RetryOptions::default();
        let err = TaskError::Failed("boom".to_string());
        assert_eq!(unbounded.should_stop(&err, u32::MAX), None);
    }

    #[test]
    fn test_any_options_are_accepted() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = RetryOptions::bounded(0)
            .with_timeout(Duration::ZERO)
            .with_delay(DelayPolicy::fixed(Duration::ZERO));
        assert!(retry(counting_failure(&calls, 10), options).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
