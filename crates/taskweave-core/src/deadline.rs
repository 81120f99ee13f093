//! Deadline enforcement for a single task
//!
//! The task runs detached on the runtime and reports its outcome through a
//! oneshot channel. Whichever of the channel and the timer fires first decides
//! the result; a task settling after the deadline finds the receiver gone and
//! its outcome is dropped.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::error::{ConfigError, ConfigResult, TaskError};

#[derive(Debug, Clone, Default)]
pub struct TimeoutOptions {
    /// `None` disables the timer.
    pub duration: Option<Duration>,
    /// Replaces the default `timed out after <n> milliseconds` message.
    pub message: Option<String>,
}

impl TimeoutOptions {
    pub fn new(duration: Duration) -> Self {
        Self { duration: Some(duration), message: None }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        match self.duration {
            Some(duration) if duration.is_zero() => Err(ConfigError::InvalidTimeout),
            _ => Ok(()),
        }
    }
}

/// Run `task` and fail with [`TaskError::TimedOut`] if it does not settle
/// within `options.duration`.
///
/// Options are checked before the task is started; an invalid duration is
/// returned as the outer error.
pub fn timeout<F, Fut, T, E>(
    task: F,
    options: TimeoutOptions,
) -> ConfigResult<impl Future<Output = Result<T, TaskError<E>>>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    options.validate()?;
    Ok(async move {
        match options.duration {
            Some(limit) => race(task(), limit, options.message.as_deref()).await,
            None => task().await.map_err(TaskError::Failed),
        }
    })
}

pub(crate) async fn race<Fut, T, E>(
    future: Fut,
    limit: Duration,
    message: Option<&str>,
) -> Result<T, TaskError<E>>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let (token, settled) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = future.await;
        if token.send(outcome).is_err() {
            trace!("task settled after its deadline; outcome discarded");
        }
    });

    // Polled timer first: a task settling at the deadline instant loses.
    tokio::select! {
        biased;
        _ = tokio::time::sleep(limit) => {
            warn!(timeout_ms = limit.as_millis() as u64, "task deadline elapsed");
            Err(TaskError::timed_out(limit, message))
        }
        outcome = settled => match outcome {
            Ok(result) => result.map_err(TaskError::Failed),
            Err(_) => Err(TaskError::Panicked),
        },
    }
}
