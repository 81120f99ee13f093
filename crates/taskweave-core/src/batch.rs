//! Grouped batch executor and its size-one form, `series`

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use crate::delay::DelayPolicy;
use crate::error::{ConfigError, ConfigResult};
use crate::observer::BatchObserver;
use crate::settlement::{Carry, Settlement};

pub struct BatchOptions<T> {
    /// Tasks per group. `None` runs every task in a single group.
    pub size: Option<usize>,
    /// Pause between two groups, computed from the finished group's start index.
    pub delay: Option<DelayPolicy>,
    pub observer: Option<Arc<dyn BatchObserver>>,
    /// Stop after the first group that contains a rejection.
    pub stop_on_reject: bool,
    /// Feed each group's settlements into the next group by position.
    pub waterfall: bool,
    /// Input for positions that have no predecessor.
    pub waterfall_seed: Option<T>,
}

impl<T> BatchOptions<T> {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_delay(mut self, delay: impl Into<DelayPolicy>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn stop_on_reject(mut self, stop: bool) -> Self {
        self.stop_on_reject = stop;
        self
    }

    /// Enable waterfall mode, optionally seeding the first group.
    pub fn waterfall(mut self, seed: Option<T>) -> Self {
        self.waterfall = true;
        self.waterfall_seed = seed;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.size == Some(0) {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl<T> Default for BatchOptions<T> {
    fn default() -> Self {
        Self {
            size: None,
            delay: None,
            observer: None,
            stop_on_reject: false,
            waterfall: false,
            waterfall_seed: None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BatchOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("size", &self.size)
            .field("delay", &self.delay)
            .field("observer", &self.observer.is_some())
            .field("stop_on_reject", &self.stop_on_reject)
            .field("waterfall", &self.waterfall)
            .field("waterfall_seed", &self.waterfall_seed)
            .finish()
    }
}

/// Options for [`series`]; the observer fires once per task.
pub struct SeriesOptions<T> {
    pub delay: Option<DelayPolicy>,
    pub observer: Option<Arc<dyn BatchObserver>>,
    pub stop_on_reject: bool,
    pub waterfall: bool,
    pub waterfall_seed: Option<T>,
}

impl<T> Default for SeriesOptions<T> {
    fn default() -> Self {
        Self {
            delay: None,
            observer: None,
            stop_on_reject: false,
            waterfall: false,
            waterfall_seed: None,
        }
    }
}

impl<T> From<SeriesOptions<T>> for BatchOptions<T> {
    fn from(options: SeriesOptions<T>) -> Self {
        Self {
            size: Some(1),
            delay: options.delay,
            observer: options.observer,
            stop_on_reject: options.stop_on_reject,
            waterfall: options.waterfall,
            waterfall_seed: options.waterfall_seed,
        }
    }
}

/// Run `tasks` in contiguous groups, one group at a time, and collect every
/// settlement in input order.
///
/// Tasks inside a group run concurrently and are joined without
/// short-circuiting. With `stop_on_reject` the result ends with the first
/// group that contained a rejection.
pub fn batch<F, Fut, T, E>(
    tasks: Vec<F>,
    options: BatchOptions<T>,
) -> ConfigResult<impl Future<Output = Vec<Settlement<T, E>>>>
where
    F: FnOnce(Carry<T, E>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: Clone,
    E: Clone,
{
    options.validate()?;

    Ok(async move {
        let total = tasks.len();
        let size = options.size.unwrap_or(total).max(1);
        let mut results: Vec<Settlement<T, E>> = Vec::with_capacity(total);
        // Settlement payloads of the previous group, by position.
        let mut carry: Vec<Carry<T, E>> = Vec::new();
        let mut pending = tasks.into_iter();
        let mut start = 0;

        while start < total {
            if let Some(observer) = &options.observer {
                observer.on_batch_start(start);
            }
            debug!(start, size, "batch group started");

            let group = pending.by_ref().take(size).enumerate().map(|(position, task)| {
                let input = if options.waterfall {
                    carry.get(position).cloned().unwrap_or_else(|| {
                        Carry::from_seed(options.waterfall_seed.as_ref())
                    })
                } else {
                    Carry::Empty
                };
                task(input)
            });
            let settled: Vec<Settlement<T, E>> =
                join_all(group).await.into_iter().map(Settlement::from).collect();

            let rejected = settled.iter().filter(|s| s.is_rejected()).count();
            if options.waterfall {
                carry = settled.iter().map(Carry::from_settlement).collect();
            }
            let finished = settled.len();
            results.extend(settled);

            if let Some(observer) = &options.observer {
                observer.on_batch_end(start);
            }
            debug!(start, settled = finished, rejected, "batch group finished");

            if options.stop_on_reject && rejected > 0 {
                info!(start, rejected, "halting batch after rejected group");
                break;
            }

            let next = start + finished;
            if next < total {
                if let Some(delay) = &options.delay {
                    delay.pause(start).await;
                }
            }
            start = next;
        }

        results
    })
}

/// [`batch`] with a group size of one.
pub fn series<F, Fut, T, E>(
    tasks: Vec<F>,
    options: SeriesOptions<T>,
) -> ConfigResult<impl Future<Output = Vec<Settlement<T, E>>>>
where
    F: FnOnce(Carry<T, E>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: Clone,
    E: Clone,
{
    batch(tasks, options.into())
}
