//! Boxed task aliases for building heterogeneous task lists

use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

use crate::settlement::Carry;

/// Re-invocable task, as taken by `parallel` and `retry`.
pub type BoxedTask<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Single-shot task taking the waterfall carry, as taken by `batch` and `series`.
pub type BoxedStage<T, E> =
    Box<dyn FnOnce(Carry<T, E>) -> BoxFuture<'static, Result<T, E>> + Send>;

pub fn boxed_task<F, Fut, T, E>(task: F) -> BoxedTask<T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Box::new(move || task().boxed())
}

pub fn boxed_stage<F, Fut, T, E>(stage: F) -> BoxedStage<T, E>
where
    F: FnOnce(Carry<T, E>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Box::new(move |carry| stage(carry).boxed())
}
