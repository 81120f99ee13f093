//! Execution profiles for taskweave, loaded from YAML, JSON or TOML, plus
//! logging setup.

pub mod error;
pub mod loader;
pub mod logging;
pub mod profile;

pub use error::{ProfileError, ProfileResult};
pub use loader::{FileFormat, ProfileLoader};
pub use profile::{
    BackoffSection, BatchSection, ExecutionProfile, ParallelSection, ProfileSet, RetrySection,
    TimeoutSection,
};
