//! Serializable execution profiles
//!
//! Durations are milliseconds. Numeric fields are signed so that negative
//! values reach validation and come back as a precise [`ConfigError`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskweave_core::{
    BatchOptions, ConfigError, DelayPolicy, ParallelOptions, RetryOptions, TimeoutOptions,
};

use crate::error::{ProfileError, ProfileResult};

/// Named profiles loaded from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSet {
    #[serde(default)]
    pub profiles: BTreeMap<String, ExecutionProfile>,
}

impl ProfileSet {
    pub fn get(&self, name: &str) -> Option<&ExecutionProfile> {
        self.profiles.get(name)
    }

    pub fn require(&self, name: &str) -> ProfileResult<&ExecutionProfile> {
        self.get(name).ok_or_else(|| ProfileError::MissingProfile(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<ParallelSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutSection>,
}

impl ExecutionProfile {
    /// Options for `parallel`; defaults when the section is absent.
    pub fn parallel_options(&self) -> ProfileResult<ParallelOptions> {
        self.parallel
            .as_ref()
            .map_or(Ok(ParallelOptions::default()), ParallelSection::to_options)
            .map_err(|e| ProfileError::invalid("parallel", e))
    }

    pub fn retry_options<E>(&self) -> ProfileResult<RetryOptions<E>> {
        self.retry
            .as_ref()
            .map_or(Ok(RetryOptions::default()), RetrySection::to_options::<E>)
            .map_err(|e| ProfileError::invalid("retry", e))
    }

    pub fn batch_options<T>(&self) -> ProfileResult<BatchOptions<T>> {
        self.batch
            .as_ref()
            .map_or(Ok(BatchOptions::default()), BatchSection::to_options::<T>)
            .map_err(|e| ProfileError::invalid("batch", e))
    }

    pub fn timeout_options(&self) -> ProfileResult<TimeoutOptions> {
        self.timeout
            .as_ref()
            .map_or(Ok(TimeoutOptions::default()), TimeoutSection::to_options)
            .map_err(|e| ProfileError::invalid("timeout", e))
    }

    /// Convert every present section, reporting the first invalid one.
    pub fn validate(&self) -> ProfileResult<()> {
        self.parallel_options()?;
        self.retry_options::<()>()?;
        self.batch_options::<()>()?;
        self.timeout_options()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParallelSection {
    pub concurrency: Option<i64>,
    pub timeout_ms: Option<i64>,
    pub retries: Option<i64>,
    #[serde(default)]
    pub stop_on_reject: bool,
}

impl ParallelSection {
    pub fn to_options(&self) -> Result<ParallelOptions, ConfigError> {
        let concurrency = match self.concurrency {
            Some(n) if n <= 0 => return Err(ConfigError::InvalidConcurrency),
            Some(n) => Some(n as usize),
            None => None,
        };
        let timeout = match self.timeout_ms {
            Some(ms) if ms <= 0 => return Err(ConfigError::InvalidTimeout),
            other => millis(other),
        };
        let options = ParallelOptions {
            concurrency,
            timeout,
            retries: retry_count(self.retries)?.unwrap_or(0),
            stop_on_reject: self.stop_on_reject,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Exponential backoff between retries: `initial_ms * multiplier^(n - 1)`,
/// capped at `max_ms`, where `n` is the retry about to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffSection {
    pub initial_ms: i64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    pub max_ms: Option<i64>,
}

fn default_multiplier() -> f64 {
    2.0
}

impl BackoffSection {
    pub fn to_policy(&self) -> Result<DelayPolicy, ConfigError> {
        if self.initial_ms < 0 || self.max_ms.is_some_and(|m| m < 0) {
            return Err(ConfigError::InvalidDelay);
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidDelay);
        }
        let initial = self.initial_ms as f64;
        let multiplier = self.multiplier;
        let cap = self.max_ms.map(|m| m as f64);
        Ok(DelayPolicy::computed(move |retry| {
            let exponent = retry.saturating_sub(1) as i32;
            let delay = initial * multiplier.powi(exponent);
            let capped = cap.map_or(delay, |c| delay.min(c));
            Duration::from_millis(capped as u64)
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Absent means retry until success.
    pub retries: Option<i64>,
    /// Zero disables the per-attempt deadline.
    pub timeout_ms: Option<i64>,
    pub delay_ms: Option<i64>,
    pub backoff: Option<BackoffSection>,
}

impl RetrySection {
    pub fn to_options<E>(&self) -> Result<RetryOptions<E>, ConfigError> {
        let timeout = match self.timeout_ms {
            Some(ms) if ms < 0 => return Err(ConfigError::InvalidTimeout),
            other => millis(other),
        };
        let delay = match (&self.backoff, self.delay_ms) {
            (Some(backoff), _) => Some(backoff.to_policy()?),
            (None, Some(ms)) if ms < 0 => return Err(ConfigError::InvalidDelay),
            (None, Some(ms)) => Some(DelayPolicy::fixed(Duration::from_millis(ms as u64))),
            (None, None) => None,
        };
        Ok(RetryOptions {
            retries: retry_count(self.retries)?,
            timeout,
            delay,
            ..RetryOptions::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSection {
    pub size: Option<i64>,
    pub delay_ms: Option<i64>,
    #[serde(default)]
    pub stop_on_reject: bool,
    #[serde(default)]
    pub waterfall: bool,
}

impl BatchSection {
    pub fn to_options<T>(&self) -> Result<BatchOptions<T>, ConfigError> {
        let size = match self.size {
            Some(n) if n <= 0 => return Err(ConfigError::InvalidBatchSize),
            Some(n) => Some(n as usize),
            None => None,
        };
        let delay = match self.delay_ms {
            Some(ms) if ms < 0 => return Err(ConfigError::InvalidDelay),
            other => millis(other).map(DelayPolicy::fixed),
        };
        Ok(BatchOptions {
            size,
            delay,
            stop_on_reject: self.stop_on_reject,
            waterfall: self.waterfall,
            ..BatchOptions::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSection {
    /// Absent means no deadline.
    pub duration_ms: Option<i64>,
    pub message: Option<String>,
}

impl TimeoutSection {
    pub fn to_options(&self) -> Result<TimeoutOptions, ConfigError> {
        let duration = match self.duration_ms {
            Some(ms) if ms <= 0 => return Err(ConfigError::InvalidTimeout),
            other => millis(other),
        };
        Ok(TimeoutOptions { duration, message: self.message.clone() })
    }
}

fn millis(value: Option<i64>) -> Option<Duration> {
    value.map(|ms| Duration::from_millis(ms.max(0) as u64))
}

fn retry_count(value: Option<i64>) -> Result<Option<u32>, ConfigError> {
    match value {
        Some(n) if n < 0 => Err(ConfigError::InvalidRetries(n)),
        Some(n) => Ok(Some(u32::try_from(n).unwrap_or(u32::MAX))),
        None => Ok(None),
    }
}
