//! FMC Pattern Contract
//!
//! Language-agnostic definition of what a Factory Method implementation must
//! satisfy, the identities of the checks it implies, and the role binding that
//! maps the contract onto a candidate's own identifiers.
//!
//! # Overview
//!
//! - **PatternContract**: immutable roles, inheritance pairs, operation shapes
//!   and behavioural rules, created once per process
//! - **CheckId / CheckResult**: one identity per contract clause and its outcome
//! - **RoleBinding**: role and operation-slot names to candidate identifiers
//!
//! # Example
//!
//! ```rust
//! use fmc_contract::{PatternContract, RoleBinding, Role, OperationSlot};
//!
//! let contract = PatternContract::describe();
//! assert_eq!(contract.clauses().len(), 10);
//!
//! let binding = RoleBinding::new()
//!     .with_role(Role::Product, "Product")
//!     .with_operation(OperationSlot::ProductOperation, "operation");
//! assert_eq!(binding.role(Role::Product), Some("Product"));
//! ```

#![warn(missing_docs)]

pub mod binding;
pub mod check;
pub mod contract;
pub mod role;

// Re-exports
pub use binding::{is_identifier, BindingError, ConcreteVariant, RoleBinding};
pub use check::{CheckId, CheckKind, CheckResult, CheckStatus, InconclusiveCause};
pub use contract::{BehavioralExpectation, InheritanceRequirement, OperationSignature, PatternContract};
pub use role::{OperationSlot, ReturnKind, Role};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for contract consumers
    pub use crate::{
        CheckId, CheckKind, CheckResult, CheckStatus, InconclusiveCause, OperationSlot,
        PatternContract, ReturnKind, Role, RoleBinding,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
