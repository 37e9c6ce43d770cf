//! Verifier configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest accepted message limit
pub const MIN_MESSAGE_CHARS: usize = 16;

/// Run-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Wall-clock budget for one run; checks not started in time are inconclusive
    #[serde(rename = "run_budget_ms", with = "optional_millis")]
    pub run_budget: Option<Duration>,
    /// Check messages longer than this are truncated
    pub max_message_chars: usize,
    /// Batch workers; `None` uses one per CPU
    pub jobs: Option<usize>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            run_budget: None,
            max_message_chars: 240,
            jobs: None,
        }
    }
}

impl VerifierConfig {
    /// Set run budget
    #[inline]
    #[must_use]
    pub fn with_run_budget(mut self, budget: Duration) -> Self {
        self.run_budget = Some(budget);
        self
    }

    /// Set message limit
    #[inline]
    #[must_use]
    pub fn with_max_message_chars(mut self, limit: usize) -> Self {
        self.max_message_chars = limit;
        self
    }

    /// Set batch parallelism
    #[inline]
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Reject values the verifier cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::ZeroJobs);
        }
        if self.max_message_chars < MIN_MESSAGE_CHARS {
            return Err(ConfigError::MessageLimitTooSmall {
                min: MIN_MESSAGE_CHARS,
                actual: self.max_message_chars,
            });
        }
        if self.run_budget == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroBudget);
        }
        Ok(())
    }

    /// Truncate a message to the configured limit, on a char boundary
    #[must_use]
    pub fn clip(&self, message: String) -> String {
        if message.chars().count() <= self.max_message_chars {
            return message;
        }
        let keep = self.max_message_chars.saturating_sub(3);
        let mut clipped: String = message.chars().take(keep).collect();
        clipped.push_str("...");
        clipped
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = VerifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_message_chars, 240);
        assert!(config.run_budget.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            VerifierConfig::default().with_jobs(0).validate(),
            Err(ConfigError::ZeroJobs)
        );
        assert_eq!(
            VerifierConfig::default().with_max_message_chars(4).validate(),
            Err(ConfigError::MessageLimitTooSmall { min: 16, actual: 4 })
        );
        assert_eq!(
            VerifierConfig::default().with_run_budget(Duration::ZERO).validate(),
            Err(ConfigError::ZeroBudget)
        );
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let config = VerifierConfig::default().with_max_message_chars(16);
        let clipped = config.clip("é".repeat(40));
        assert_eq!(clipped.chars().count(), 16);
        assert!(clipped.ends_with("..."));
        assert_eq!(config.clip("short".to_string()), "short");
    }

    #[test]
    fn deserializes_budget_in_millis() {
        let config: VerifierConfig = serde_json::from_str(r#"{"run_budget_ms": 1500, "jobs": 2}"#).unwrap();
        assert_eq!(config.run_budget, Some(Duration::from_millis(1500)));
        assert_eq!(config.jobs, Some(2));
        assert_eq!(config.max_message_chars, 240);
    }
}
