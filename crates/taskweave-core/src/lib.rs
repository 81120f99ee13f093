//! Asynchronous task orchestration: grouped batches, bounded parallelism,
//! retries and deadlines.

pub mod batch;
pub mod deadline;
pub mod delay;
pub mod error;
pub mod observer;
pub mod parallel;
pub mod retry;
pub mod settlement;
pub mod task;

// Re-export commonly used types
pub use batch::{batch, series, BatchOptions, SeriesOptions};
pub use deadline::{timeout, TimeoutOptions};
pub use delay::{wait, DelayPolicy};
pub use error::{ConfigError, ConfigResult, TaskError};
pub use observer::{BatchObserver, HookObserver};
pub use parallel::{parallel, ParallelOptions};
pub use retry::{retry, RetryOptions, RetryPredicate};
pub use settlement::{Carry, Settlement};
pub use task::{boxed_stage, boxed_task, BoxedStage, BoxedTask};
