//! Command-line harness for Factory Method conformance checks
//!
//! # Overview
//!
//! Wraps the verifier for graders: loads C++ submissions and role bindings
//! from disk, runs one or many verifications, and prints text or JSON
//! reports. The `fmc` binary is a thin dispatcher over [`commands`].
//!
//! # Example
//!
//! ```no_run
//! use fmc_harness::commands::{self, VerifyOptions};
//!
//! let options = VerifyOptions {
//!     sources: vec!["student.cpp".into()],
//!     binding: "pascal.toml".into(),
//!     structural_only: true,
//!     ..VerifyOptions::default()
//! };
//! let code = commands::verify(&options, &mut std::io::stdout())?;
//! std::process::exit(code);
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod report;

pub use cli::build_cli;
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use logging::LogFormat;
pub use manifest::{BatchManifest, ManifestEntry};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
