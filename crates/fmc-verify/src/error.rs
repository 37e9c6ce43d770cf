//! Error types for verification runs
//!
//! Check outcomes never surface as errors; a candidate that crashes or
//! misbehaves yields `fail` or `inconclusive` results. These errors cover the
//! verifier's own setup:
//! - Invalid configuration values
//! - Batch worker pool failures

/// Invalid verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Parallelism of zero workers
    #[error("jobs must be at least 1")]
    ZeroJobs,

    /// Message limit too small to hold any text
    #[error("max_message_chars must be at least {min}, got {actual}")]
    MessageLimitTooSmall {
        /// Smallest accepted limit
        min: usize,
        /// Configured limit
        actual: usize,
    },

    /// Run budget of zero length
    #[error("run budget must be positive")]
    ZeroBudget,
}

/// Batch execution errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Worker pool could not be created
    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
