//! Harness configuration file
//!
//! ```toml
//! [verifier]
//! run_budget_ms = 30000
//! max_message_chars = 240
//! jobs = 4
//!
//! [gxx]
//! compiler = "g++"
//! standard = "c++17"
//! extra_flags = ["-O0"]
//! compile_timeout_ms = 60000
//! probe_timeout_ms = 10000
//! ```

use crate::error::HarnessError;
use fmc_candidate::GxxConfig;
use fmc_verify::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Combined verifier and compiler settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Run settings
    pub verifier: VerifierConfig,
    /// C++ compiler settings
    pub gxx: GxxConfig,
}

impl HarnessConfig {
    /// Parse TOML
    pub fn from_toml_str(content: &str) -> Result<Self, HarnessError> {
        toml::from_str(content).map_err(|e| HarnessError::Parse {
            what: "configuration",
            message: e.to_string(),
        })
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_toml_str(&content)
    }
}
