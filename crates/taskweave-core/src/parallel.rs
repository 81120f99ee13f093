//! Bounded-concurrency executor
//!
//! Keeps a cursor over the task list and at most `concurrency` retry chains in
//! flight. Every chain is spawned on the runtime, so stopping early only stops
//! the executor from waiting: chains still in flight run to completion with
//! their outcome dropped.

use std::future::Future;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, info};

use crate::error::{ConfigError, ConfigResult, TaskError};
use crate::retry::{self, RetryOptions};
use crate::settlement::Settlement;

#[derive(Debug, Clone, Default)]
pub struct ParallelOptions {
    /// Maximum tasks in flight. `None` starts everything at once.
    pub concurrency: Option<usize>,
    /// Deadline applied to every attempt.
    pub timeout: Option<Duration>,
    /// Retries per task after its first attempt.
    pub retries: u32,
    /// Finish on the first task whose retries are exhausted.
    pub stop_on_reject: bool,
}

impl ParallelOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn stop_on_reject(mut self, stop: bool) -> Self {
        self.stop_on_reject = stop;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == Some(0) {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    fn retry_policy<E>(&self) -> RetryOptions<E> {
        RetryOptions { timeout: self.timeout, ..RetryOptions::bounded(self.retries) }
    }
}

/// Run `tasks` with bounded concurrency and collect one settlement per task
/// in input order.
///
/// With `stop_on_reject` the result is cut at the cursor: it holds one entry
/// per task started so far, and tasks that were still running are reported as
/// [`TaskError::Abandoned`].
pub fn parallel<F, Fut, T, E>(
    tasks: Vec<F>,
    options: ParallelOptions,
) -> ConfigResult<impl Future<Output = Vec<Settlement<T, TaskError<E>>>>>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    options.validate()?;

    Ok(async move {
        let total = tasks.len();
        let limit = options.concurrency.map_or(total, |k| k.min(total));
        let policy = options.retry_policy::<E>();

        let mut slots: Vec<Option<Settlement<T, TaskError<E>>>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut pending = tasks.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut started = 0usize;

        let launch = |index: usize, task: F| {
            let handle = tokio::spawn(retry::run(task, policy.clone()));
            async move { (index, handle.await) }
        };

        for (index, task) in pending.by_ref().take(limit) {
            in_flight.push(launch(index, task));
            started += 1;
        }
        debug!(total, concurrency = limit, "parallel execution started");

        while let Some((index, joined)) = in_flight.next().await {
            let settlement = match joined {
                Ok(result) => Settlement::from(result),
                Err(err) => {
                    error!(index, error = %err, "task panicked");
                    Settlement::rejected(TaskError::Panicked)
                }
            };
            let rejected = settlement.is_rejected();
            slots[index] = Some(settlement);

            if rejected && options.stop_on_reject {
                info!(
                    index,
                    started,
                    still_running = in_flight.len(),
                    "stopping on first rejection"
                );
                return finalize(slots, started);
            }

            if let Some((next, task)) = pending.next() {
                in_flight.push(launch(next, task));
                started += 1;
            }
        }

        finalize(slots, total)
    })
}

fn finalize<T, E>(
    slots: Vec<Option<Settlement<T, TaskError<E>>>>,
    len: usize,
) -> Vec<Settlement<T, TaskError<E>>> {
    slots
        .into_iter()
        .take(len)
        .map(|slot| slot.unwrap_or_else(|| Settlement::rejected(TaskError::Abandoned)))
        .collect()
}
