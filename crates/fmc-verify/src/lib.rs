//! FMC Verification Engine
//!
//! Decides whether a candidate implements the Factory Method pattern.
//!
//! # Overview
//!
//! - **StructuralVerifier**: abstractness, inheritance and operation shapes,
//!   answered from the candidate model without running code
//! - **BehavioralVerifier**: instantiates concrete roles and observes the
//!   product operation, the factory and the orchestration
//! - **aggregate**: orders results by contract clause and derives the verdict
//! - **Verifier**: runs, run budgets, cancellation and batches
//!
//! Structural problems never stop behavioral checks from reporting; a check
//! whose prerequisites are missing reports `inconclusive` instead.
//!
//! # Example
//!
//! ```rust
//! use fmc_candidate::{Candidate, CandidateModel};
//! use fmc_contract::RoleBinding;
//! use fmc_verify::Verifier;
//!
//! let candidate = Candidate::structural_only("empty", CandidateModel::new());
//! let verdict = Verifier::default().verify(&candidate, &RoleBinding::new());
//!
//! assert!(!verdict.passed());
//! assert_eq!(verdict.results().len(), 10);
//! ```

#![warn(missing_docs)]

pub mod aggregate;
pub mod batch;
pub mod behavioral;
pub mod config;
pub mod engine;
pub mod error;
pub mod scope;
pub mod structural;

// Re-exports
pub use aggregate::{aggregate, aggregate_clauses, Verdict, VerdictSummary};
pub use batch::Submission;
pub use behavioral::BehavioralVerifier;
pub use config::VerifierConfig;
pub use engine::{CancellationToken, RunReport, Verifier};
pub use error::{BatchError, ConfigError};
pub use scope::{ObjectKey, Outcome, Scope};
pub use structural::StructuralVerifier;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for harness authors
    pub use crate::{CancellationToken, RunReport, Submission, Verdict, Verifier, VerifierConfig};
    pub use fmc_contract::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
