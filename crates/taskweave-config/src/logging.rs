//! Logging configuration and initialization
//!
//! Structured logging with tracing-subscriber, pretty or JSON output.

use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::time::Instant;
use taskweave_core::Settlement;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging from `RUST_LOG` and `TASKWEAVE_JSON_LOGS`
pub fn init() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let json_logs = std::env::var("TASKWEAVE_JSON_LOGS")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    init_with_config(&log_level, json_logs)
}

/// Initialize logging with custom configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init_with_config(log_level: &str, json_logs: bool) -> Result<()> {
    let env_filter = EnvFilter::from_str(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_level(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        log_level = %log_level,
        json_logs = %json_logs,
        "Logging initialized"
    );

    Ok(())
}

/// Log the outcome of one orchestration run
pub fn log_settlements<T, E>(label: &str, results: &[Settlement<T, E>], start: Instant) {
    let rejected = results.iter().filter(|s| s.is_rejected()).count();
    let duration = start.elapsed();
    if rejected == 0 {
        tracing::info!(
            run = %label,
            settled = results.len(),
            duration_ms = %duration.as_millis(),
            "Run completed"
        );
    } else {
        tracing::warn!(
            run = %label,
            settled = results.len(),
            rejected,
            duration_ms = %duration.as_millis(),
            "Run completed with rejections"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Whichever call wins, the other must report the conflict.
        let first = init_with_config("debug", false);
        let second = init_with_config("debug", true);
        assert!(first.is_err() || second.is_err());
    }

    #[test]
    fn test_log_settlements_accepts_mixed_results() {
        let results: Vec<Settlement<u32, String>> =
            vec![Settlement::fulfilled(1), Settlement::rejected("boom".to_string())];
        log_settlements("mixed", &results, Instant::now());
        log_settlements::<u32, String>("empty", &[], Instant::now());
    }
}
