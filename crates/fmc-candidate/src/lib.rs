//! FMC Candidates
//!
//! Everything the verifier knows about an implementation under test.
//!
//! # Overview
//!
//! - **CandidateModel**: types, bases, operations and abstractness, answered
//!   without running any candidate code
//! - **CandidateRuntime / CandidateObject**: construct instances and invoke
//!   operations by name for behavioral checks
//! - **NativeRuntime**: in-process candidates written in Rust
//! - **cpp**: tree-sitter extraction plus g++-compiled probes for C++ sources
//!
//! # Example
//!
//! ```rust
//! use fmc_candidate::{CandidateModel, TypeDescriptor};
//! use fmc_contract::ReturnKind;
//!
//! let model = CandidateModel::new()
//!     .with_type(TypeDescriptor::new("Product").with_pure("operation", ReturnKind::Text))
//!     .with_type(
//!         TypeDescriptor::new("Widget")
//!             .extends("Product")
//!             .with_method("operation", ReturnKind::Text),
//!     );
//!
//! assert!(model.abstractness("Product").unwrap().is_abstract());
//! assert!(model.inherits_from("Widget", "Product"));
//! ```

#![warn(missing_docs)]

pub mod candidate;
pub mod cpp;
pub mod descriptor;
pub mod native;
pub mod runtime;

// Re-exports
pub use candidate::{fingerprint, Candidate, CandidateError};
pub use cpp::{extract_model, CppSources, ExtractError, GxxConfig, GxxRuntime, SourceError};
pub use descriptor::{unqualified, Abstractness, CandidateModel, OperationDescriptor, TypeDescriptor};
pub use native::NativeRuntime;
pub use runtime::{CandidateObject, CandidateRuntime, InvocationError, UnavailableRuntime, Value};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for candidate authors
    pub use crate::{
        Candidate, CandidateModel, CandidateObject, CandidateRuntime, InvocationError,
        NativeRuntime, OperationDescriptor, TypeDescriptor, Value,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
