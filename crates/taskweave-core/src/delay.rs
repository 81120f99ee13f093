//! Delay policies between groups and retry attempts

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Suspend for `duration` on the tokio timer.
pub async fn wait(duration: Duration) {
    tokio::time::sleep(duration).await;
}

type DelayFn = Arc<dyn Fn(usize) -> Duration + Send + Sync>;

/// How long to pause between two groups or two attempts.
#[derive(Clone)]
pub enum DelayPolicy {
    Fixed(Duration),
    /// Computed from the start index of the finished group, or from the
    /// retry count for retries.
    Computed(DelayFn),
}

impl DelayPolicy {
    pub fn fixed(duration: Duration) -> Self {
        Self::Fixed(duration)
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(usize) -> Duration + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    pub fn duration_for(&self, index: usize) -> Duration {
        match self {
            Self::Fixed(duration) => *duration,
            Self::Computed(f) => f(index),
        }
    }

    pub(crate) async fn pause(&self, index: usize) {
        match self {
            // A zero fixed delay means no delay at all.
            Self::Fixed(duration) if duration.is_zero() => {}
            _ => wait(self.duration_for(index)).await,
        }
    }
}

impl fmt::Debug for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(duration) => f.debug_tuple("Fixed").field(duration).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl From<Duration> for DelayPolicy {
    fn from(duration: Duration) -> Self {
        Self::Fixed(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_duration_for() {
        let fixed = DelayPolicy::fixed(Duration::from_millis(50));
        assert_eq!(fixed.duration_for(3), Duration::from_millis(50));

        let linear = DelayPolicy::computed(|i| Duration::from_millis(10 * i as u64));
        assert_eq!(linear.duration_for(4), Duration::from_millis(40));
        assert_eq!(format!("{:?}", linear), "Computed(<fn>)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_advances_clock() {
        let start = Instant::now();
        wait(Duration::from_millis(200)).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_fixed_delay_does_not_sleep() {
        let start = Instant::now();
        DelayPolicy::fixed(Duration::ZERO).pause(0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
