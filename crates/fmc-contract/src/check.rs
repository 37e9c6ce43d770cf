//! Check identities and outcomes
//!
//! Every clause of the contract becomes one [`CheckId`]. Verifiers produce a
//! [`CheckResult`] per executed clause; the aggregator orders and merges them.

use crate::role::{OperationSlot, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a check inspects shape or executes candidate code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Instantiation-free inspection of type shape
    Structural,
    /// Requires instantiating and invoking candidate code
    Behavioral,
}

/// Identity of one contract clause
///
/// Clauses about the concrete roles carry the index of the concrete
/// product/creator pair they test. Pair 0 is the one in the binding's
/// `[roles]` table and keeps the unsuffixed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckId {
    /// The type bound to `role` must not be directly constructible
    Abstract {
        /// Role under test
        role: Role,
    },
    /// The type bound to `child` must be-a the type bound to `parent`
    Inherits {
        /// Deriving role
        child: Role,
        /// Base role
        parent: Role,
        /// Concrete pair under test
        #[serde(default, skip_serializing_if = "is_first")]
        variant: usize,
    },
    /// The bound operation must exist with the contract's shape
    Signature {
        /// Operation under test
        slot: OperationSlot,
    },
    /// The concrete product's operation must return non-empty text
    OperationNonEmpty {
        /// Concrete product role
        role: Role,
        /// Concrete pair under test
        #[serde(default, skip_serializing_if = "is_first")]
        variant: usize,
    },
    /// The concrete creator's factory must return a product
    FactoryReturnsProduct {
        /// Concrete creator role
        role: Role,
        /// Concrete pair under test
        #[serde(default, skip_serializing_if = "is_first")]
        variant: usize,
    },
    /// The concrete creator's orchestration output must embed the product payload
    OrchestrationEmbedsProduct {
        /// Concrete creator role
        role: Role,
        /// Concrete pair under test
        #[serde(default, skip_serializing_if = "is_first")]
        variant: usize,
    },
}

impl CheckId {
    /// Structural or behavioral
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CheckKind {
        match self {
            CheckId::Abstract { .. } | CheckId::Inherits { .. } | CheckId::Signature { .. } => {
                CheckKind::Structural
            }
            CheckId::OperationNonEmpty { .. }
            | CheckId::FactoryReturnsProduct { .. }
            | CheckId::OrchestrationEmbedsProduct { .. } => CheckKind::Behavioral,
        }
    }

    /// Concrete pair a clause tests; 0 for clauses about the abstract roles
    #[inline]
    #[must_use]
    pub fn variant(&self) -> usize {
        match *self {
            CheckId::Abstract { .. } | CheckId::Signature { .. } => 0,
            CheckId::Inherits { variant, .. }
            | CheckId::OperationNonEmpty { variant, .. }
            | CheckId::FactoryReturnsProduct { variant, .. }
            | CheckId::OrchestrationEmbedsProduct { variant, .. } => variant,
        }
    }

    /// Same clause for another concrete pair
    ///
    /// Clauses about the abstract roles are returned unchanged.
    #[must_use]
    pub fn for_variant(self, n: usize) -> Self {
        match self {
            CheckId::Inherits { child, parent, .. } => CheckId::Inherits {
                child,
                parent,
                variant: n,
            },
            CheckId::OperationNonEmpty { role, .. } => CheckId::OperationNonEmpty { role, variant: n },
            CheckId::FactoryReturnsProduct { role, .. } => {
                CheckId::FactoryReturnsProduct { role, variant: n }
            }
            CheckId::OrchestrationEmbedsProduct { role, .. } => {
                CheckId::OrchestrationEmbedsProduct { role, variant: n }
            }
            other => other,
        }
    }

    /// Dotted key, e.g. `structural.inherits.concrete_product.product`
    ///
    /// Clauses for concrete pair `n > 0` end in `[n]`.
    #[must_use]
    pub fn key(&self) -> String {
        let base = match self {
            CheckId::Abstract { role } => format!("structural.abstract.{}", role.key()),
            CheckId::Inherits { child, parent, .. } => {
                format!("structural.inherits.{}.{}", child.key(), parent.key())
            }
            CheckId::Signature { slot } => format!("structural.signature.{}", slot.key()),
            CheckId::OperationNonEmpty { role, .. } => {
                format!("behavioral.operation_non_empty.{}", role.key())
            }
            CheckId::FactoryReturnsProduct { role, .. } => {
                format!("behavioral.factory_returns_product.{}", role.key())
            }
            CheckId::OrchestrationEmbedsProduct { role, .. } => {
                format!("behavioral.orchestration_embeds_product.{}", role.key())
            }
        };
        match self.variant() {
            0 => base,
            n => format!("{base}[{n}]"),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_first(variant: &usize) -> bool {
    *variant == 0
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Executed and satisfied
    Pass,
    /// Executed and violated
    Fail,
    /// Could not be meaningfully executed
    Inconclusive,
}

impl CheckStatus {
    /// Lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Inconclusive => "inconclusive",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a check could not be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconclusiveCause {
    /// The binding has no identifier for a required role or operation
    UnboundRole,
    /// The bound identifier names no type in the candidate
    MissingType,
    /// The bound type cannot be instantiated (abstract, no constructor)
    NotInstantiable,
    /// Constructing the candidate object failed or panicked
    Construction,
    /// Invoking candidate code failed, crashed, panicked or timed out
    Runtime,
    /// The factory produced no product, so dependent behaviour is undefined
    AbsentProduct,
    /// The product payload was empty, so containment is undecidable
    EmptyPayload,
    /// The run was cancelled before this check started
    Cancelled,
    /// The run budget ran out before this check started
    BudgetExhausted,
    /// No result was produced for this clause
    NotExecuted,
}

impl InconclusiveCause {
    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InconclusiveCause::UnboundRole => "unbound_role",
            InconclusiveCause::MissingType => "missing_type",
            InconclusiveCause::NotInstantiable => "not_instantiable",
            InconclusiveCause::Construction => "construction",
            InconclusiveCause::Runtime => "runtime",
            InconclusiveCause::AbsentProduct => "absent_product",
            InconclusiveCause::EmptyPayload => "empty_payload",
            InconclusiveCause::Cancelled => "cancelled",
            InconclusiveCause::BudgetExhausted => "budget_exhausted",
            InconclusiveCause::NotExecuted => "not_executed",
        }
    }
}

/// Outcome of one contract clause with diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Which clause
    pub id: CheckId,
    /// Pass, fail or inconclusive
    pub status: CheckStatus,
    /// Set only for inconclusive results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<InconclusiveCause>,
    /// Human-readable explanation
    pub message: String,
}

impl CheckResult {
    /// Passing result
    #[must_use]
    pub fn pass(id: CheckId, message: impl Into<String>) -> Self {
        Self {
            id,
            status: CheckStatus::Pass,
            cause: None,
            message: message.into(),
        }
    }

    /// Failing result
    #[must_use]
    pub fn fail(id: CheckId, message: impl Into<String>) -> Self {
        Self {
            id,
            status: CheckStatus::Fail,
            cause: None,
            message: message.into(),
        }
    }

    /// Inconclusive result with cause
    #[must_use]
    pub fn inconclusive(id: CheckId, cause: InconclusiveCause, message: impl Into<String>) -> Self {
        Self {
            id,
            status: CheckStatus::Inconclusive,
            cause: Some(cause),
            message: message.into(),
        }
    }

    /// Check if the clause was satisfied
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.id, self.message)?;
        if let Some(cause) = self.cause {
            write!(f, " ({})", cause.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_keys_are_stable() {
        let id = CheckId::Inherits {
            child: Role::ConcreteProduct,
            parent: Role::Product,
            variant: 0,
        };
        assert_eq!(id.key(), "structural.inherits.concrete_product.product");
        assert_eq!(id.kind(), CheckKind::Structural);
    }

    #[test]
    fn later_concrete_pairs_get_indexed_keys() {
        let id = CheckId::FactoryReturnsProduct {
            role: Role::ConcreteCreator,
            variant: 0,
        };
        let second = id.for_variant(1);
        assert_eq!(second.variant(), 1);
        assert_eq!(second.key(), "behavioral.factory_returns_product.concrete_creator[1]");
        assert_eq!(second.for_variant(0), id);

        let abstract_role = CheckId::Abstract { role: Role::Product };
        assert_eq!(abstract_role.for_variant(3), abstract_role);
    }

    #[test]
    fn variant_is_omitted_from_json_for_the_first_pair() {
        let first = CheckId::OperationNonEmpty {
            role: Role::ConcreteProduct,
            variant: 0,
        };
        let json = serde_json::to_value(first).unwrap();
        assert!(json.get("variant").is_none());
        let back: CheckId = serde_json::from_value(json).unwrap();
        assert_eq!(back, first);

        let json = serde_json::to_value(first.for_variant(2)).unwrap();
        assert_eq!(json["variant"], 2);
    }

    #[test]
    fn behavioral_ids_report_behavioral_kind() {
        let id = CheckId::OrchestrationEmbedsProduct {
            role: Role::ConcreteCreator,
            variant: 0,
        };
        assert_eq!(id.kind(), CheckKind::Behavioral);
    }

    #[test]
    fn inconclusive_result_carries_cause() {
        let id = CheckId::Abstract { role: Role::Product };
        let result = CheckResult::inconclusive(id, InconclusiveCause::UnboundRole, "product is not bound");
        assert!(!result.is_pass());
        assert_eq!(result.cause, Some(InconclusiveCause::UnboundRole));
        assert!(result.to_string().contains("unbound_role"));
    }

    #[test]
    fn check_id_serializes_with_tag() {
        let id = CheckId::Signature {
            slot: OperationSlot::FactoryMethod,
        };
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json["check"], "signature");
        assert_eq!(json["slot"], "factory_method");
    }
}
