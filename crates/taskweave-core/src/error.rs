use std::time::Duration;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid option values. Always reported before any task is started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("concurrency must be greater than 0")]
    InvalidConcurrency,

    #[error("timeout must be greater than 0")]
    InvalidTimeout,

    #[error("retries must be greater than or equal to 0, got {0}")]
    InvalidRetries(i64),

    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    #[error("delay must be greater than or equal to 0")]
    InvalidDelay,
}

/// Failure of a single task as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError<E> {
    /// The task settled with its own error.
    #[error("{0}")]
    Failed(E),

    /// The deadline elapsed before the task settled.
    #[error("{message}")]
    TimedOut { after: Duration, message: String },

    /// The executor stopped on a rejection before this task settled.
    #[error("abandoned: executor stopped before the task settled")]
    Abandoned,

    /// The detached task panicked before producing an outcome.
    #[error("task panicked before settling")]
    Panicked,
}

impl<E> TaskError<E> {
    pub fn timed_out(after: Duration, message: Option<&str>) -> Self {
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("timed out after {} milliseconds", whole_millis(after)));
        Self::TimedOut { after, message }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The task's own error, if it failed on its own.
    pub fn as_failure(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Timers fire on millisecond ticks, so partial milliseconds round up.
fn whole_millis(duration: Duration) -> u128 {
    duration.as_micros().div_ceil(1000)
}
