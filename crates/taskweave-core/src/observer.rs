//! Group lifecycle hooks for the batch executor

/// Receives group boundaries from [`batch`](crate::batch::batch) and
/// [`series`](crate::batch::series).
///
/// Both hooks are called synchronously on the executor's task with the
/// index of the first task in the group. For a given group,
/// `on_batch_start` fires before any of its tasks is invoked and
/// `on_batch_end` fires after every task in it has settled, before any
/// stop-on-reject check or inter-group delay.
pub trait BatchObserver: Send + Sync {
    fn on_batch_start(&self, _start: usize) {}

    fn on_batch_end(&self, _start: usize) {}
}

/// Observer built from a pair of closures.
pub struct HookObserver<S, E> {
    on_start: S,
    on_end: E,
}

impl<S, E> HookObserver<S, E>
where
    S: Fn(usize) + Send + Sync,
    E: Fn(usize) + Send + Sync,
{
    pub fn new(on_start: S, on_end: E) -> Self {
        Self { on_start, on_end }
    }
}

impl<S, E> BatchObserver for HookObserver<S, E>
where
    S: Fn(usize) + Send + Sync,
    E: Fn(usize) + Send + Sync,
{
    fn on_batch_start(&self, start: usize) {
        (self.on_start)(start)
    }

    fn on_batch_end(&self, start: usize) {
        (self.on_end)(start)
    }
}
